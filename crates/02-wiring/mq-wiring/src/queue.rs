//! Receive-side endpoint: a flow controller behind its own lock and condvars.
//!
//! Each queue is an independent shared resource. Senders park on `writable`
//! until the controller reopens admission, receivers park on `readable` until
//! something arrives, and closing the queue wakes both. Reopening admission
//! also bumps a transport-wide signal shared by every queue, so a sender
//! choosing among several queues can wait for whichever frees up first.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};
use smallvec::SmallVec;
use tracing::{debug, trace};

use mq_flow::{Admission, Delivery, FlowController, FlowState, MessageMask, Signal};

use crate::ids::{QueueId, Scope};
use crate::{WiringError, WiringResult};

/// Point-in-time counters for one queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueStats {
    pub accepted: u64,
    pub swapped: u64,
    pub rejected: u64,
    pub delivered: u64,
    /// Messages dropped at receive time because their type was masked out.
    pub masked: u64,
    pub volume: u64,
    pub swapped_bytes: usize,
    pub state: FlowState,
}

pub(crate) struct QueueState {
    flow: FlowController,
    closed: bool,
    masked: u64,
}

pub(crate) struct QueueCell {
    pub(crate) id: QueueId,
    pub(crate) name: String,
    pub(crate) scope: Scope,
    pub(crate) location: Option<String>,
    state: Mutex<QueueState>,
    readable: Condvar,
    writable: Condvar,
    reopened: Arc<Signal>,
}

impl QueueCell {
    pub(crate) fn new(
        id: QueueId,
        name: String,
        scope: Scope,
        location: Option<String>,
        flow: FlowController,
        reopened: Arc<Signal>,
    ) -> Self {
        Self {
            id,
            name,
            scope,
            location,
            state: Mutex::new(QueueState {
                flow,
                closed: false,
                masked: 0,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            reopened,
        }
    }

    /// Offers one delivery, parking while the controller refuses if `blocking`.
    pub(crate) fn offer(&self, delivery: &Delivery, blocking: bool) -> WiringResult<Admission> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(WiringError::Closed);
            }
            let admission = state.flow.admit(delivery)?;
            if admission.is_admitted() {
                drop(state);
                self.readable.notify_one();
                return Ok(admission);
            }
            if !blocking {
                return Ok(admission);
            }
            trace!(queue = %self.id, "queue: sender parked on admission");
            self.writable.wait(&mut state);
        }
    }

    /// Offers `delivery` to every cell, enqueuing into all of them or none.
    ///
    /// Cells are locked in id order, so concurrent fan-outs never deadlock.
    pub(crate) fn offer_all(cells: &[Arc<QueueCell>], delivery: &Delivery) -> WiringResult<bool> {
        let mut ordered: SmallVec<[&Arc<QueueCell>; 8]> = cells.iter().collect();
        ordered.sort_by_key(|cell| cell.id);
        ordered.dedup_by_key(|cell| cell.id);

        let mut guards: SmallVec<[MutexGuard<'_, QueueState>; 8]> =
            ordered.iter().map(|cell| cell.state.lock()).collect();
        if guards.iter().any(|state| state.closed) {
            return Err(WiringError::Closed);
        }

        let len = delivery.message.payload().len();
        let all_admit = guards.iter().all(|state| state.flow.would_admit(len));
        for state in guards.iter_mut() {
            if all_admit || !state.flow.would_admit(len) {
                // Refusing queues record the rejection and update their state.
                state.flow.admit(delivery)?;
            }
        }
        drop(guards);

        if all_admit {
            for cell in ordered {
                cell.readable.notify_one();
            }
        }
        Ok(all_admit)
    }

    /// Takes the oldest delivery whose type passes `mask`, dropping masked ones.
    pub(crate) fn take<M>(&self, blocking: bool, mask: M) -> WiringResult<Option<Delivery>>
    where
        M: Fn() -> MessageMask,
    {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(WiringError::Closed);
            }
            match state.flow.take()? {
                Some(delivery) => {
                    if state.flow.state() == FlowState::Admitting {
                        self.writable.notify_all();
                        self.reopened.notify_all();
                    }
                    if mask().allows(delivery.message.kind()) {
                        return Ok(Some(delivery));
                    }
                    state.masked += 1;
                    trace!(queue = %self.id, kind = ?delivery.message.kind(), "queue: dropped masked message");
                }
                None => {
                    if !blocking {
                        return Ok(None);
                    }
                    self.readable.wait(&mut state);
                }
            }
        }
    }

    /// Marks the queue closed, discards its contents, and wakes every parked thread.
    pub(crate) fn close(&self) -> u64 {
        let mut state = self.state.lock();
        if state.closed {
            return 0;
        }
        state.closed = true;
        let dropped = match state.flow.clear() {
            Ok(dropped) => dropped,
            Err(err) => {
                debug!(queue = %self.id, %err, "queue: swap cleanup failed on close");
                0
            }
        };
        drop(state);
        self.readable.notify_all();
        self.writable.notify_all();
        dropped
    }

    pub(crate) fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        let flow = state.flow.stats();
        QueueStats {
            accepted: flow.accepted,
            swapped: flow.swapped,
            rejected: flow.rejected,
            delivered: flow.delivered,
            masked: state.masked,
            volume: state.flow.volume(),
            swapped_bytes: state.flow.swapped_bytes(),
            state: state.flow.state(),
        }
    }
}
