//! Signal processors
//!
//! Pure algorithm/state-buffer pairs used by the metric collectors: each owns
//! only its rolling window and derived scalars, takes samples through a
//! `push`/`observe` call, and exposes `reset` for session reuse.

pub mod coverage;
pub mod fixation;
pub mod stats;
pub mod stress;
pub mod tremor;

pub use coverage::CoverageGrid;
pub use fixation::{FixationDetector, FixationEvent, GazeTick, SaccadeEvent};
pub use stats::{normalized_entropy, percentile, summarize, MovingAverage, StreamingStats, SummaryStats};
pub use stress::{StressDynamics, StressEvent, StressEventDetector};
pub use tremor::{AimStability, TremorEstimator};
