use tracing::{error, trace};

use crate::handle::ProducerHandle;
use crate::kind::ScenarioKind;
use crate::record::ScenarioLog;
use crate::runner::Stage;

/// Sends a scenario's sequence numbers in order, yielding back to the runner
/// whenever flow control refuses one.
pub struct ProducerEngine<H> {
    handle: H,
    kind: ScenarioKind,
    log: ScenarioLog,
    next: u32,
    total: u32,
    halted: bool,
}

impl<H> ProducerEngine<H>
where
    H: ProducerHandle,
{
    pub fn new(handle: H, kind: ScenarioKind, log: ScenarioLog) -> Self {
        Self {
            handle,
            kind,
            log,
            next: 0,
            total: kind.total_messages(),
            halted: false,
        }
    }

    /// Whether the engine stopped early because the transport failed.
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Sends left in this step. A burst that was cut short by a refusal
    /// finishes its group before the next one starts.
    fn budget(&self) -> u32 {
        match self.kind {
            ScenarioKind::Burst { burst_size, .. } if burst_size > 0 => {
                burst_size - self.next % burst_size
            }
            kind => kind.step_budget(),
        }
    }
}

impl<H> Stage for ProducerEngine<H>
where
    H: ProducerHandle,
{
    fn step(&mut self) -> usize {
        let budget = self.budget();
        let mut moved = 0;
        while moved < budget && self.next < self.total {
            match self.handle.try_send(self.next) {
                Ok(true) => {
                    self.log.record_sent();
                    self.next += 1;
                    moved += 1;
                }
                Ok(false) => {
                    trace!(seq = self.next, "scenario: send refused");
                    self.log.record_refused();
                    break;
                }
                Err(err) => {
                    error!(seq = self.next, %err, "scenario: send failed");
                    self.halted = true;
                    break;
                }
            }
        }
        moved as usize
    }

    fn is_done(&self) -> bool {
        self.halted || self.next >= self.total
    }

    fn label(&self) -> &'static str {
        self.kind.label()
    }
}
