//! Wiring layer of the message transport.
//!
//! A [`Transport`] is one open session. It owns named exchanges (send side)
//! and queues (receive side), the bindings between them, and a flow
//! controller per queue. [`Session`] exposes the same operations with plain
//! integers, strings and byte slices.

mod binding;
mod config;
mod error;
mod exchange;
mod ids;
mod queue;
mod registry;
mod session;
mod substrate;
mod transport;

pub use binding::Binding;
pub use config::{ExchangeSpec, QueueSpec, TransportBuilder, TransportConfig};
pub use error::{WiringError, WiringResult};
pub use ids::{
    ExchangeId, QueueId, Scope, Style, SCOPE_GLOBAL, SCOPE_LOCAL, SCOPE_PROCESS,
    STYLE_DATA_DISTRIBUTION, STYLE_LOAD_BALANCING,
};
pub use queue::QueueStats;
pub use session::{RawMessage, Session};
pub use substrate::{
    EndpointDescriptor, EndpointKind, LoopbackSubstrate, Substrate, SubstrateError,
};
pub use transport::{Received, Transport};

pub use mq_flow::{
    FlowPolicy, FlowState, Message, MessageMask, MessageType, Watermark, MESSAGE_DATA,
    MESSAGE_GAP, NO_LIMIT, NO_SWAP,
};
