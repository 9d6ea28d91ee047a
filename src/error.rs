//! Error types for the metrics engine

use thiserror::Error;

/// Errors that can occur during metric configuration and session orchestration
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Invalid metric parameters: {0}")]
    InvalidParameters(String),

    #[error("A metric named '{0}' is already registered")]
    DuplicateMetric(String),

    #[error("No metric named '{0}' is registered")]
    UnknownMetric(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse replay frame: {0}")]
    FrameParseError(String),

    #[error("Sink delivery failed: {0}")]
    SinkError(String),
}
