//! Watermark configuration for per-queue flow control.

use crate::swap::SWAP_RECORD_HEADER;
use crate::{FlowError, FlowResult};

/// Raw value meaning "no limit" on the binding surface.
pub const NO_LIMIT: i64 = -1;
/// Raw swap size meaning "no overflow area".
pub const NO_SWAP: i64 = 0;

/// A message-count threshold, or the absence of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Watermark {
    Limit(u64),
    NoLimit,
}

impl Watermark {
    /// Decodes the raw binding value: any negative number means [`Watermark::NoLimit`].
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Watermark::NoLimit
        } else {
            Watermark::Limit(raw as u64)
        }
    }

    pub fn limit(self) -> Option<u64> {
        match self {
            Watermark::Limit(n) => Some(n),
            Watermark::NoLimit => None,
        }
    }
}

/// Validated admission policy owned by one queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowPolicy {
    high: Watermark,
    low: u64,
    swap_bytes: u64,
}

impl FlowPolicy {
    /// Validates `low <= high` when the high watermark is finite, and that a
    /// configured swap area can hold at least one record header.
    ///
    /// With an unlimited high watermark the low watermark never takes effect
    /// and is stored as zero.
    pub fn new(high: Watermark, low: Watermark, swap_bytes: u64) -> FlowResult<Self> {
        match high {
            Watermark::NoLimit => Ok(Self {
                high,
                low: 0,
                swap_bytes,
            }),
            Watermark::Limit(0) => Err(FlowError::ZeroHighWatermark),
            Watermark::Limit(_) if swap_bytes > 0 && swap_bytes < SWAP_RECORD_HEADER as u64 => {
                Err(FlowError::SwapTooSmall {
                    capacity: swap_bytes,
                })
            }
            Watermark::Limit(hwm) => {
                let low = match low {
                    Watermark::Limit(lwm) if lwm <= hwm => lwm,
                    Watermark::Limit(lwm) => {
                        return Err(FlowError::InvalidWatermark { high: hwm, low: lwm })
                    }
                    Watermark::NoLimit => {
                        return Err(FlowError::InvalidWatermark {
                            high: hwm,
                            low: u64::MAX,
                        })
                    }
                };
                Ok(Self {
                    high,
                    low,
                    swap_bytes,
                })
            }
        }
    }

    /// Decodes the raw `(hwm, lwm, swap)` triple taken by queue creation.
    pub fn from_raw(hwm: i64, lwm: i64, swap: i64) -> FlowResult<Self> {
        Self::new(
            Watermark::from_raw(hwm),
            Watermark::from_raw(lwm),
            swap.max(0) as u64,
        )
    }

    /// Unbounded queue without overflow storage.
    pub fn unlimited() -> Self {
        Self {
            high: Watermark::NoLimit,
            low: 0,
            swap_bytes: 0,
        }
    }

    pub fn high(&self) -> Watermark {
        self.high
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn swap_bytes(&self) -> u64 {
        self.swap_bytes
    }

    pub fn swap_enabled(&self) -> bool {
        self.swap_bytes > 0 && self.high != Watermark::NoLimit
    }
}
