//! Metric collectors
//!
//! The six standard collectors, each implementing the [`crate::metric::Metric`]
//! capability interface over its own signal processors and history buffers.

pub mod awareness;
pub mod classification;
pub mod controller;
pub mod gaze;
pub mod reaction_time;
pub mod stress;

pub use awareness::{AwarenessSample, SituationalAwarenessMetric, ThreatAssessment, VisibleEntity};
pub use classification::{ClassificationMetric, ClassificationSample, ConfusionMatrix};
pub use controller::{ControllerMovementMetric, Gesture, InteractionControl, InteractionEvent};
pub use gaze::GazeTrackingMetric;
pub use reaction_time::ReactionTimeMetric;
pub use stress::{StressInputs, StressLevelMetric, StressWeights};
