/// Load pattern a producer drives through the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioKind {
    /// Sends `messages` back to back, up to a fixed batch per step.
    Flood { messages: u32 },
    /// Sends `bursts` groups of `burst_size`, one group per step.
    Burst { bursts: u32, burst_size: u32 },
    /// Sends `messages` into a queue expected to push back.
    Backpressure { messages: u32 },
}

impl ScenarioKind {
    pub fn total_messages(&self) -> u32 {
        match *self {
            ScenarioKind::Flood { messages } | ScenarioKind::Backpressure { messages } => messages,
            ScenarioKind::Burst { bursts, burst_size } => bursts.saturating_mul(burst_size),
        }
    }

    /// Most sends a producer attempts in one step.
    pub(crate) fn step_budget(&self) -> u32 {
        match *self {
            ScenarioKind::Flood { .. } => 100,
            ScenarioKind::Burst { burst_size, .. } => burst_size,
            ScenarioKind::Backpressure { .. } => 50,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScenarioKind::Flood { .. } => "flood",
            ScenarioKind::Burst { .. } => "burst",
            ScenarioKind::Backpressure { .. } => "backpressure",
        }
    }
}
