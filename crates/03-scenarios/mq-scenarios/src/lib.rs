//! Load scenarios driven through a [`mq_wiring::Transport`].
//!
//! A [`ProducerEngine`] and a [`ConsumerEngine`] share a [`ScenarioLog`] and
//! are stepped in turn by a [`ScenarioRunner`]; the `verify_*` helpers then
//! check the resulting [`ScenarioRecord`].

mod checks;
mod consumer;
mod handle;
mod kind;
mod producer;
mod record;
mod runner;

pub use checks::{verify_backpressure, verify_burst, verify_flood, CheckResult};
pub use consumer::ConsumerEngine;
pub use handle::{ProducerHandle, TransportHandle};
pub use kind::ScenarioKind;
pub use producer::ProducerEngine;
pub use record::{ScenarioLog, ScenarioRecord};
pub use runner::{RunSummary, ScenarioRunner, Stage};

/// Payload carrying a scenario sequence number.
#[inline]
pub fn sequence_payload(seq: u32) -> [u8; 4] {
    seq.to_le_bytes()
}

/// Reads back a sequence number written by [`sequence_payload`].
#[inline]
pub fn decode_sequence(payload: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = payload.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}
