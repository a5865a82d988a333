//! What a scenario run observed, shared between its producer and consumer.

use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct ScenarioRecord {
    /// Sends accepted by the transport.
    pub produced: u32,
    /// Non-blocking sends refused by flow control.
    pub rejected: u32,
    /// Sequence numbers in the order the consumer received them.
    pub received: Vec<u32>,
    /// Messages whose payload was not a sequence number.
    pub malformed: u32,
    /// Deepest queue volume the consumer sampled before draining.
    pub max_depth: u64,
}

/// Cloneable handle to one run's [`ScenarioRecord`].
#[derive(Clone, Default)]
pub struct ScenarioLog(Arc<Mutex<ScenarioRecord>>);

impl ScenarioLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self) {
        let mut record = self.0.lock();
        record.produced = record.produced.wrapping_add(1);
    }

    pub fn record_refused(&self) {
        let mut record = self.0.lock();
        record.rejected = record.rejected.wrapping_add(1);
    }

    pub fn record_received(&self, seq: Option<u32>) {
        let mut record = self.0.lock();
        match seq {
            Some(seq) => record.received.push(seq),
            None => record.malformed = record.malformed.wrapping_add(1),
        }
    }

    pub fn observe_depth(&self, depth: u64) {
        let mut record = self.0.lock();
        record.max_depth = record.max_depth.max(depth);
    }

    pub fn received_count(&self) -> usize {
        self.0.lock().received.len()
    }

    pub fn snapshot(&self) -> ScenarioRecord {
        self.0.lock().clone()
    }
}
