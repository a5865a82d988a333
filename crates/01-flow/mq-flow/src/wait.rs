//! Sequence-counter wait/notify used for transport-wide conditions.
//!
//! Threads that need to wait on "anything changed" (an arrival on any queue, a
//! new binding) snapshot the sequence with [`Signal::observe`], re-check their
//! condition, then park with [`Signal::wait_past`]. Notifiers bump the
//! sequence before waking, so a notify between observe and park is never lost.
//! Parking is futex-backed through the `atomic-wait` crate.

use std::sync::atomic::{AtomicU32, Ordering};

/// Result of attempting to wait on an atomic location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The caller parked and was woken by a notify.
    Ok,
    /// The sequence had already moved when the wait was attempted.
    NotEqual,
}

#[derive(Debug, Default)]
pub struct Signal {
    seq: AtomicU32,
    waiters: AtomicU32,
}

impl Signal {
    pub const fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            waiters: AtomicU32::new(0),
        }
    }

    /// Captures the current sequence.
    #[inline]
    pub fn observe(&self) -> u32 {
        self.seq.load(Ordering::Acquire)
    }

    /// Blocks until the sequence differs from `observed`.
    ///
    /// May return spuriously; callers loop over their own condition.
    pub fn wait_past(&self, observed: u32) -> WaitResult {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let result = if self.seq.load(Ordering::SeqCst) != observed {
            WaitResult::NotEqual
        } else {
            atomic_wait::wait(&self.seq, observed);
            WaitResult::Ok
        };
        self.waiters.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// Advances the sequence and wakes every parked thread.
    pub fn notify_all(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) > 0 {
            atomic_wait::wake_all(&self.seq as *const AtomicU32);
        }
    }
}
