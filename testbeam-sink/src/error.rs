//! Error types for span sinks

use thiserror::Error;

/// Errors surfaced by sink flush/stop operations.
///
/// Open/finish calls never fail from the tracker's point of view; a sink
/// that hits trouble records it and reports on the next flush.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink was already stopped.
    #[error("sink is stopped")]
    Closed,

    /// Writing records to the underlying target failed.
    #[error("failed to write span records: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized.
    #[error("failed to serialize span record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SinkError {
    /// Check if this error means the sink was already closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
