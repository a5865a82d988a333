use mq_wiring::{QueueId, Transport};
use tracing::error;

use crate::decode_sequence;
use crate::record::ScenarioLog;
use crate::runner::Stage;

const DRAIN_BATCH: usize = 64;

/// Drains one queue without blocking, sampling its depth before each batch.
pub struct ConsumerEngine {
    transport: Transport,
    queue: QueueId,
    expected: usize,
    log: ScenarioLog,
    halted: bool,
}

impl ConsumerEngine {
    pub fn new(transport: Transport, queue: QueueId, expected: u32, log: ScenarioLog) -> Self {
        Self {
            transport,
            queue,
            expected: expected as usize,
            log,
            halted: false,
        }
    }

    pub fn halted(&self) -> bool {
        self.halted
    }
}

impl Stage for ConsumerEngine {
    fn step(&mut self) -> usize {
        match self.transport.queue_stats(self.queue) {
            Ok(stats) => self.log.observe_depth(stats.volume),
            Err(err) => {
                error!(queue = %self.queue, %err, "scenario: queue stats failed");
                self.halted = true;
                return 0;
            }
        }

        let mut moved = 0;
        while moved < DRAIN_BATCH {
            match self.transport.receive(self.queue, false) {
                Ok(Some(received)) => {
                    self.log
                        .record_received(decode_sequence(received.message.payload()));
                    moved += 1;
                }
                Ok(None) => break,
                Err(err) => {
                    error!(queue = %self.queue, %err, "scenario: receive failed");
                    self.halted = true;
                    break;
                }
            }
        }
        moved
    }

    fn is_done(&self) -> bool {
        self.halted || self.log.received_count() >= self.expected
    }

    fn label(&self) -> &'static str {
        "consumer"
    }
}
