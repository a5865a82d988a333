//! Name and id lookup for the endpoints of one transport.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::binding::BindingTable;
use crate::exchange::ExchangeEntry;
use crate::ids::{ExchangeId, QueueId};
use crate::queue::QueueCell;
use crate::{WiringError, WiringResult};

#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) exchanges: Vec<Arc<ExchangeEntry>>,
    pub(crate) queues: Vec<Arc<QueueCell>>,
    exchange_names: HashMap<String, ExchangeId>,
    queue_names: HashMap<String, QueueId>,
    pub(crate) bindings: BindingTable,
}

impl Registry {
    pub(crate) fn ensure_exchange_name_free(&self, name: &str) -> WiringResult<()> {
        if self.exchange_names.contains_key(name) {
            return Err(WiringError::DuplicateEndpoint(name.to_owned()));
        }
        Ok(())
    }

    pub(crate) fn ensure_queue_name_free(&self, name: &str) -> WiringResult<()> {
        if self.queue_names.contains_key(name) {
            return Err(WiringError::DuplicateEndpoint(name.to_owned()));
        }
        Ok(())
    }

    pub(crate) fn next_exchange_id(&self) -> ExchangeId {
        ExchangeId::from_index(self.exchanges.len())
    }

    pub(crate) fn next_queue_id(&self) -> QueueId {
        QueueId::from_index(self.queues.len())
    }

    pub(crate) fn insert_exchange(&mut self, entry: ExchangeEntry) -> ExchangeId {
        let id = entry.id;
        debug_assert_eq!(id, self.next_exchange_id());
        self.exchange_names.insert(entry.name.clone(), id);
        self.exchanges.push(Arc::new(entry));
        id
    }

    pub(crate) fn insert_queue(&mut self, cell: QueueCell) -> QueueId {
        let id = cell.id;
        debug_assert_eq!(id, self.next_queue_id());
        self.queue_names.insert(cell.name.clone(), id);
        self.queues.push(Arc::new(cell));
        id
    }

    pub(crate) fn exchange(&self, id: ExchangeId) -> WiringResult<&Arc<ExchangeEntry>> {
        self.exchanges
            .get(id.index())
            .ok_or_else(|| WiringError::unknown(id))
    }

    pub(crate) fn queue(&self, id: QueueId) -> WiringResult<&Arc<QueueCell>> {
        self.queues.get(id.index()).ok_or_else(|| WiringError::unknown(id))
    }

    pub(crate) fn exchange_id(&self, name: &str) -> WiringResult<ExchangeId> {
        self.exchange_names
            .get(name)
            .copied()
            .ok_or_else(|| WiringError::unknown(name))
    }

    pub(crate) fn queue_id(&self, name: &str) -> WiringResult<QueueId> {
        self.queue_names
            .get(name)
            .copied()
            .ok_or_else(|| WiringError::unknown(name))
    }

    /// Resolves an exchange and the queues currently bound to it.
    pub(crate) fn route(
        &self,
        id: ExchangeId,
    ) -> WiringResult<(Arc<ExchangeEntry>, SmallVec<[Arc<QueueCell>; 8]>)> {
        let entry = Arc::clone(self.exchange(id)?);
        let mut targets = SmallVec::new();
        for queue in self.bindings.targets(id) {
            targets.push(Arc::clone(self.queue(queue)?));
        }
        Ok((entry, targets))
    }
}
