//! Flow-control primitives shared by the wiring layer.
//!
//! * [`Message`] / [`MessageType`] / [`MessageMask`] – immutable payloads tagged as data or gap.
//! * [`Watermark`] / [`FlowPolicy`] – admission ceiling, resumption floor, and swap budget.
//! * [`SwapArea`] – file-backed byte ring absorbing arrivals beyond the high watermark.
//! * [`FlowController`] – per-queue admission state machine with hysteresis.
//! * [`Signal`] – sequence counter that threads can park on until it moves.

mod controller;
mod error;
mod message;
mod swap;
mod watermark;
pub mod wait;

pub use controller::{Admission, Delivery, FlowController, FlowState, FlowStats};
pub use error::{FlowError, FlowResult};
pub use message::{Message, MessageMask, MessageType, MESSAGE_DATA, MESSAGE_GAP};
pub use swap::{SwapArea, SWAP_RECORD_HEADER};
pub use wait::Signal;
pub use watermark::{FlowPolicy, Watermark, NO_LIMIT, NO_SWAP};
