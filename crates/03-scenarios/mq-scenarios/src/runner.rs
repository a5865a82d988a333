//! Cooperative driver interleaving a scenario's producer and consumer stages
//! on the calling thread.

use std::thread;

use tracing::{debug, warn};

/// One side of a scenario, advanced a bounded amount per step.
pub trait Stage: Send {
    /// Does some work and reports how many messages it moved.
    fn step(&mut self) -> usize;
    /// True once the stage has nothing left to do, including after a failure.
    fn is_done(&self) -> bool;
    fn label(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rounds: u64,
    pub moved: u64,
    /// The run gave up because no stage made progress for the idle limit.
    pub stalled: bool,
}

pub struct ScenarioRunner {
    stages: Vec<Box<dyn Stage>>,
    idle_limit: u32,
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            idle_limit: 10_000,
        }
    }

    /// Consecutive rounds without progress tolerated before the run stalls.
    pub fn idle_limit(mut self, rounds: u32) -> Self {
        self.idle_limit = rounds;
        self
    }

    pub fn push<S>(&mut self, stage: S) -> &mut Self
    where
        S: Stage + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    /// Steps every unfinished stage once, in registration order.
    pub fn round(&mut self) -> usize {
        self.stages
            .iter_mut()
            .filter(|stage| !stage.is_done())
            .map(|stage| stage.step())
            .sum()
    }

    /// Runs rounds until every stage is done or progress stops.
    pub fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut idle = 0u32;
        while !self.stages.iter().all(|stage| stage.is_done()) {
            let moved = self.round();
            summary.rounds += 1;
            summary.moved += moved as u64;
            if moved > 0 {
                idle = 0;
                continue;
            }
            idle += 1;
            if idle >= self.idle_limit {
                let pending: Vec<&str> = self
                    .stages
                    .iter()
                    .filter(|stage| !stage.is_done())
                    .map(|stage| stage.label())
                    .collect();
                warn!(?pending, rounds = summary.rounds, "scenario: stalled");
                summary.stalled = true;
                return summary;
            }
            thread::yield_now();
        }
        debug!(rounds = summary.rounds, moved = summary.moved, "scenario: finished");
        summary
    }
}
