use thiserror::Error;

pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("low watermark {low} exceeds high watermark {high}")]
    InvalidWatermark { high: u64, low: u64 },

    #[error("high watermark must be positive or unlimited")]
    ZeroHighWatermark,

    #[error("swap area of {capacity} bytes cannot hold a single record header")]
    SwapTooSmall { capacity: u64 },

    #[error("swap record of {len} bytes does not fit a {capacity} byte swap area")]
    RecordTooLarge { len: usize, capacity: usize },

    #[error("swap storage error: {0}")]
    Swap(#[from] std::io::Error),
}
