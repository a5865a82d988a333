//! Per-queue admission control.
//!
//! ```text
//!            volume reaches hwm            swap full / record does not fit
//! Admitting ───────────────────▶ Swapping ───────────────────────────────▶ Blocked
//!     ▲   └──────────── volume reaches hwm, no swap ───────────────────────────┘ │
//!     └──────────────────────── volume drops to <= lwm ◀─────────────────────────┘
//! ```
//!
//! Memory holds at most `hwm` messages. While the swap ring is non-empty the
//! in-memory deque is kept full by refilling from swap on every take, so the
//! oldest messages are always in memory and order is global across both.

use std::collections::VecDeque;
use std::path::Path;

use tracing::{debug, trace};

use crate::message::Message;
use crate::swap::SwapArea;
use crate::watermark::{FlowPolicy, Watermark};
use crate::FlowResult;

/// A message together with the opaque tag of the endpoint that sent it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub source: u32,
    pub message: Message,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowState {
    /// Below the high watermark; arrivals go to memory.
    Admitting,
    /// At or above the high watermark; arrivals go to swap.
    Swapping,
    /// Swap absent or exhausted; arrivals are refused until volume <= lwm.
    Blocked,
}

/// Outcome of offering a delivery to the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Held in memory.
    Accepted,
    /// Persisted to the swap area.
    Swapped,
    /// Refused; nothing was enqueued.
    Rejected,
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        !matches!(self, Admission::Rejected)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlowStats {
    pub accepted: u64,
    pub swapped: u64,
    pub rejected: u64,
    pub delivered: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placement {
    Memory,
    Swap,
    Reject,
}

pub struct FlowController {
    policy: FlowPolicy,
    state: FlowState,
    memory: VecDeque<Delivery>,
    swap: Option<SwapArea>,
    stats: FlowStats,
}

impl FlowController {
    /// Creates a controller, allocating the swap area in `swap_dir` when the policy asks for one.
    pub fn new(policy: FlowPolicy, swap_dir: Option<&Path>) -> FlowResult<Self> {
        let swap = if policy.swap_enabled() {
            Some(SwapArea::new(policy.swap_bytes() as usize, swap_dir)?)
        } else {
            None
        };
        Ok(Self {
            policy,
            state: FlowState::Admitting,
            memory: VecDeque::new(),
            swap,
            stats: FlowStats::default(),
        })
    }

    pub fn policy(&self) -> &FlowPolicy {
        &self.policy
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Messages currently queued across memory and swap.
    pub fn volume(&self) -> u64 {
        (self.memory.len() + self.swap.as_ref().map_or(0, SwapArea::len)) as u64
    }

    /// Messages currently held in memory.
    pub fn in_memory(&self) -> usize {
        self.memory.len()
    }

    /// Bytes currently occupied in the swap area.
    pub fn swapped_bytes(&self) -> usize {
        self.swap.as_ref().map_or(0, SwapArea::used_bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.volume() == 0
    }

    pub fn stats(&self) -> FlowStats {
        self.stats
    }

    /// Whether a payload of `payload_len` bytes would be admitted right now.
    pub fn would_admit(&self, payload_len: usize) -> bool {
        self.placement(payload_len) != Placement::Reject
    }

    /// Offers a delivery. Rejection leaves the queue untouched.
    pub fn admit(&mut self, delivery: &Delivery) -> FlowResult<Admission> {
        match self.placement(delivery.message.payload().len()) {
            Placement::Memory => {
                self.memory.push_back(delivery.clone());
                self.stats.accepted += 1;
                if let Watermark::Limit(hwm) = self.policy.high() {
                    if self.memory.len() as u64 >= hwm {
                        let next = if self.swap.is_some() {
                            FlowState::Swapping
                        } else {
                            FlowState::Blocked
                        };
                        self.enter(next);
                    }
                }
                Ok(Admission::Accepted)
            }
            Placement::Swap => {
                let pushed = match self.swap.as_mut() {
                    Some(swap) => swap.push(delivery)?,
                    None => false,
                };
                if pushed {
                    self.stats.accepted += 1;
                    self.stats.swapped += 1;
                    trace!(
                        swapped_bytes = self.swapped_bytes(),
                        "flow: arrival spilled to swap"
                    );
                    Ok(Admission::Swapped)
                } else {
                    self.reject()
                }
            }
            Placement::Reject => self.reject(),
        }
    }

    /// Removes the oldest delivery, refilling memory from swap.
    pub fn take(&mut self) -> FlowResult<Option<Delivery>> {
        let next = match self.memory.pop_front() {
            Some(delivery) => Some(delivery),
            None => match self.swap.as_mut() {
                Some(swap) => swap.pop()?,
                None => None,
            },
        };
        let Some(delivery) = next else {
            return Ok(None);
        };

        self.refill()?;
        self.stats.delivered += 1;
        if self.state != FlowState::Admitting && self.volume() <= self.policy.low() {
            self.enter(FlowState::Admitting);
        }
        Ok(Some(delivery))
    }

    /// Drops everything queued, returning how many deliveries were discarded.
    pub fn clear(&mut self) -> FlowResult<u64> {
        let mut dropped = self.memory.len() as u64;
        self.memory.clear();
        if let Some(swap) = self.swap.as_mut() {
            while swap.pop()?.is_some() {
                dropped += 1;
            }
        }
        self.enter(FlowState::Admitting);
        Ok(dropped)
    }

    fn placement(&self, payload_len: usize) -> Placement {
        let swap_pending = self.swap.as_ref().is_some_and(|swap| !swap.is_empty());
        match self.state {
            FlowState::Admitting => match self.policy.high() {
                Watermark::NoLimit => Placement::Memory,
                Watermark::Limit(hwm) => {
                    if !swap_pending && (self.memory.len() as u64) < hwm {
                        Placement::Memory
                    } else {
                        self.swap_placement(payload_len)
                    }
                }
            },
            FlowState::Swapping => self.swap_placement(payload_len),
            FlowState::Blocked => Placement::Reject,
        }
    }

    fn swap_placement(&self, payload_len: usize) -> Placement {
        match &self.swap {
            Some(swap) if swap.fits(payload_len) => Placement::Swap,
            _ => Placement::Reject,
        }
    }

    fn reject(&mut self) -> FlowResult<Admission> {
        if self.state == FlowState::Swapping {
            self.enter(FlowState::Blocked);
        }
        self.stats.rejected += 1;
        Ok(Admission::Rejected)
    }

    fn refill(&mut self) -> FlowResult<()> {
        let Watermark::Limit(hwm) = self.policy.high() else {
            return Ok(());
        };
        let Some(swap) = self.swap.as_mut() else {
            return Ok(());
        };
        let mut moved = 0usize;
        while (self.memory.len() as u64) < hwm {
            match swap.pop()? {
                Some(delivery) => {
                    self.memory.push_back(delivery);
                    moved += 1;
                }
                None => break,
            }
        }
        if moved > 0 {
            trace!(moved, remaining = swap.len(), "flow: refilled memory from swap");
        }
        Ok(())
    }

    fn enter(&mut self, next: FlowState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, volume = self.volume(), "flow: state change");
            self.state = next;
        }
    }
}
