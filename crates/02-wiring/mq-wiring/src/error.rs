use thiserror::Error;

use mq_flow::FlowError;

pub type WiringResult<T> = Result<T, WiringError>;

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("transport was never opened")]
    NotInitialized,

    #[error("transport is closed")]
    Closed,

    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("endpoint name already registered: {0}")]
    DuplicateEndpoint(String),

    #[error("invalid watermarks: low {low} exceeds high {high}")]
    InvalidWatermark { high: u64, low: u64 },

    #[error("queue is full")]
    QueueFull,

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("invalid transport configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("flow control error: {0}")]
    Flow(FlowError),
}

impl WiringError {
    pub fn unknown(endpoint: impl ToString) -> Self {
        WiringError::UnknownEndpoint(endpoint.to_string())
    }
}

impl From<FlowError> for WiringError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::InvalidWatermark { high, low } => WiringError::InvalidWatermark { high, low },
            FlowError::ZeroHighWatermark => {
                WiringError::InvalidConfig("high watermark must be positive")
            }
            FlowError::SwapTooSmall { .. } => {
                WiringError::InvalidConfig("swap area smaller than one record header")
            }
            other => WiringError::Flow(other),
        }
    }
}
