use crate::transport::TransportError;
use thiserror::Error;

/// Errors that end the current operation.
///
/// Per-item failures inside a batch or clone fan-out are not errors; they are
/// reported as data by the aggregator and the orchestrator.
#[derive(Debug, Error)]
pub enum PrismError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("invalid job: {0}")]
    InvalidJob(String),
}

impl PrismError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        PrismError::MalformedResponse(msg.into())
    }
}

impl From<serde_json::Error> for PrismError {
    fn from(value: serde_json::Error) -> Self {
        PrismError::MalformedResponse(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PrismError>;
