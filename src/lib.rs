//! Opsim Metrics - Real-time behavioral metrics engine for simulation-based
//! operator training
//!
//! The engine ingests per-tick sensor samples (gaze rays, controller poses,
//! head pose) and domain events (avatar spawned/classified/despawned), runs
//! online signal processing over them, and exposes both live snapshots and
//! end-of-session statistical reports:
//!
//! sample/event stream → metric collectors → signal processors → snapshots →
//! registry → sink collaborators.
//!
//! ## Modules
//!
//! - **Metric collectors**: classification, reaction time, controller
//!   movement, gaze tracking, stress level, situational awareness
//! - **Signal processors**: fixation/saccade detection, tremor estimation,
//!   coverage grids, stress dynamics
//! - **Registry**: session orchestration, interval collection, sink delivery

pub mod error;
pub mod events;
pub mod metric;
pub mod metrics;
pub mod params;
pub mod registry;
pub mod replay;
pub mod sample;
pub mod signal;
pub mod value;

pub use error::MetricsError;
pub use events::{AvatarEvent, PredictedClass};
pub use metric::{Metric, MetricAnalysisResult, MetricState, Recorder};
pub use params::MetricParameters;
pub use registry::{MetricRegistry, MetricsSink, SessionRecord, SessionReport};
pub use replay::{Engine, ReplayFrame};
pub use value::{MetricValue, Snapshot};

/// Engine version embedded in produced records
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for session records
pub const PRODUCER_NAME: &str = "opsim-metrics";
