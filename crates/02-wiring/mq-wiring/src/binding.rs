//! Exchange-to-queue routing table.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::ids::{ExchangeId, QueueId};

/// One exchange-to-queue link and the opaque arguments it was created with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub exchange: ExchangeId,
    pub queue: QueueId,
    pub exchange_args: Option<String>,
    pub queue_args: Option<String>,
}

/// Many-to-many relation between exchanges and queues.
///
/// Targets are kept in binding order; the load-balancing rotation walks them
/// in that order.
#[derive(Default)]
pub(crate) struct BindingTable {
    by_exchange: HashMap<ExchangeId, Vec<Binding>>,
    len: usize,
}

impl BindingTable {
    /// Records `binding`. Returns `false` when the pair already existed, in
    /// which case only its arguments are replaced.
    pub(crate) fn bind(&mut self, binding: Binding) -> bool {
        let links = self.by_exchange.entry(binding.exchange).or_default();
        if let Some(existing) = links.iter_mut().find(|link| link.queue == binding.queue) {
            *existing = binding;
            return false;
        }
        links.push(binding);
        self.len += 1;
        true
    }

    pub(crate) fn targets(&self, exchange: ExchangeId) -> SmallVec<[QueueId; 8]> {
        self.by_exchange
            .get(&exchange)
            .map(|links| links.iter().map(|link| link.queue).collect())
            .unwrap_or_default()
    }

    pub(crate) fn sources(&self, queue: QueueId) -> Vec<ExchangeId> {
        let mut sources: Vec<ExchangeId> = self
            .by_exchange
            .values()
            .flatten()
            .filter(|link| link.queue == queue)
            .map(|link| link.exchange)
            .collect();
        sources.sort();
        sources
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.by_exchange.values().flatten()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
