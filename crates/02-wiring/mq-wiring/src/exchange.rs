//! Send-side endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ids::{ExchangeId, Scope, Style};

pub(crate) struct ExchangeEntry {
    pub(crate) id: ExchangeId,
    pub(crate) name: String,
    pub(crate) scope: Scope,
    pub(crate) location: Option<String>,
    pub(crate) style: Style,
    cursor: AtomicUsize,
}

impl ExchangeEntry {
    pub(crate) fn new(
        id: ExchangeId,
        name: String,
        scope: Scope,
        location: Option<String>,
        style: Style,
    ) -> Self {
        Self {
            id,
            name,
            scope,
            location,
            style,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Advances the load-balancing rotation and returns where it starts for
    /// a send over `targets` bound queues.
    pub(crate) fn next_start(&self, targets: usize) -> usize {
        debug_assert!(targets > 0);
        self.cursor.fetch_add(1, Ordering::Relaxed) % targets
    }
}
