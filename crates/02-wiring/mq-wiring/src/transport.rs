//! The open session: endpoint registry, routing, and the send/receive paths.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use mq_flow::{Delivery, FlowController, Message, MessageMask, Signal};

use crate::binding::Binding;
use crate::config::{ExchangeSpec, QueueSpec, TransportBuilder, TransportConfig};
use crate::exchange::ExchangeEntry;
use crate::ids::{ExchangeId, QueueId, Scope, Style};
use crate::queue::{QueueCell, QueueStats};
use crate::registry::Registry;
use crate::substrate::{EndpointDescriptor, EndpointKind};
use crate::{WiringError, WiringResult};

/// A message handed to a receiver together with where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Received {
    pub queue: QueueId,
    pub exchange: ExchangeId,
    pub message: Message,
}

/// Handle to an open transport. Clones share the same session; the session
/// closes when [`Transport::close`] is called or the last clone is dropped.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

struct Inner {
    host: String,
    config: TransportConfig,
    mask: AtomicU32,
    closed: AtomicBool,
    registry: RwLock<Registry>,
    /// Bumped whenever a delivery is enqueued anywhere.
    arrivals: Signal,
    /// Bumped whenever a binding is added.
    topology: Signal,
    /// Bumped when a take leaves a queue admitting or a binding adds a target.
    reopened: Arc<Signal>,
    any_cursor: AtomicUsize,
}

impl Transport {
    /// Opens a session with `host` using the default configuration.
    pub fn open(host: impl Into<String>) -> WiringResult<Self> {
        Self::builder(host).open()
    }

    pub fn builder(host: impl Into<String>) -> TransportBuilder {
        TransportBuilder::new(host)
    }

    pub(crate) fn with_config(host: String, config: TransportConfig) -> WiringResult<Self> {
        config
            .substrate
            .connect(&host)
            .map_err(|err| WiringError::ConnectionError(err.to_string()))?;
        debug!(
            host = %host,
            substrate = config.substrate.name(),
            "transport: opened"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                mask: AtomicU32::new(config.mask.bits()),
                host,
                config,
                closed: AtomicBool::new(false),
                registry: RwLock::new(Registry::default()),
                arrivals: Signal::new(),
                topology: Signal::new(),
                reopened: Arc::new(Signal::new()),
                any_cursor: AtomicUsize::new(0),
            }),
        })
    }

    pub fn host(&self) -> &str {
        &self.inner.host
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> WiringResult<()> {
        if self.is_closed() {
            return Err(WiringError::Closed);
        }
        Ok(())
    }

    /// Replaces the set of message types surfaced by receive calls. Data is
    /// always included.
    pub fn mask(&self, mask: MessageMask) -> WiringResult<()> {
        self.ensure_open()?;
        let mask = MessageMask::from_bits(mask.bits());
        self.inner.mask.store(mask.bits(), Ordering::Release);
        debug!(bits = mask.bits(), "transport: mask updated");
        Ok(())
    }

    pub fn current_mask(&self) -> MessageMask {
        MessageMask::from_bits(self.inner.mask.load(Ordering::Acquire))
    }

    pub fn create_exchange(&self, name: &str, spec: ExchangeSpec) -> WiringResult<ExchangeId> {
        let mut registry = self.inner.registry.write();
        self.ensure_open()?;
        registry.ensure_exchange_name_free(name)?;
        self.attach(EndpointKind::Exchange, name, spec.scope, spec.location.as_deref())?;

        let id = registry.next_exchange_id();
        registry.insert_exchange(ExchangeEntry::new(
            id,
            name.to_owned(),
            spec.scope,
            spec.location,
            spec.style,
        ));
        debug!(%id, name, scope = ?spec.scope, style = ?spec.style, "transport: exchange created");
        Ok(id)
    }

    pub fn create_queue(&self, name: &str, spec: QueueSpec) -> WiringResult<QueueId> {
        let policy = spec.policy()?;
        let mut registry = self.inner.registry.write();
        self.ensure_open()?;
        registry.ensure_queue_name_free(name)?;
        self.attach(EndpointKind::Queue, name, spec.scope, spec.location.as_deref())?;

        let swap_dir = self.inner.config.swap_dir.as_deref();
        let flow = FlowController::new(policy, swap_dir)?;
        let id = registry.next_queue_id();
        registry.insert_queue(QueueCell::new(
            id,
            name.to_owned(),
            spec.scope,
            spec.location,
            flow,
            Arc::clone(&self.inner.reopened),
        ));
        debug!(
            %id,
            name,
            scope = ?spec.scope,
            high = ?policy.high(),
            low = policy.low(),
            swap_bytes = policy.swap_bytes(),
            "transport: queue created"
        );
        Ok(id)
    }

    fn attach(
        &self,
        kind: EndpointKind,
        name: &str,
        scope: Scope,
        location: Option<&str>,
    ) -> WiringResult<()> {
        if scope.is_local() {
            return Ok(());
        }
        let descriptor = EndpointDescriptor {
            kind,
            name: name.to_owned(),
            scope,
            location: location.map(str::to_owned),
        };
        self.inner
            .config
            .substrate
            .attach(&descriptor)
            .map_err(|err| WiringError::ConnectionError(err.to_string()))
    }

    /// Links an exchange to a queue by name. Binding the same pair again
    /// replaces its arguments.
    pub fn bind(
        &self,
        exchange: &str,
        queue: &str,
        exchange_args: Option<&str>,
        queue_args: Option<&str>,
    ) -> WiringResult<()> {
        {
            let mut registry = self.inner.registry.write();
            self.ensure_open()?;
            let exchange_id = registry.exchange_id(exchange)?;
            let queue_id = registry.queue_id(queue)?;
            let created = registry.bindings.bind(Binding {
                exchange: exchange_id,
                queue: queue_id,
                exchange_args: exchange_args.map(str::to_owned),
                queue_args: queue_args.map(str::to_owned),
            });
            debug!(
                exchange,
                queue,
                created,
                total = registry.bindings.len(),
                "transport: bound"
            );
        }
        self.inner.topology.notify_all();
        self.inner.reopened.notify_all();
        Ok(())
    }

    pub fn exchange_id(&self, name: &str) -> WiringResult<ExchangeId> {
        self.ensure_open()?;
        self.inner.registry.read().exchange_id(name)
    }

    pub fn queue_id(&self, name: &str) -> WiringResult<QueueId> {
        self.ensure_open()?;
        self.inner.registry.read().queue_id(name)
    }

    /// Current bindings, grouped by exchange.
    pub fn bindings(&self) -> Vec<Binding> {
        let registry = self.inner.registry.read();
        let mut bindings: Vec<Binding> = registry.bindings.iter().cloned().collect();
        bindings.sort_by_key(|binding| binding.exchange);
        bindings
    }

    /// Every registered endpoint, exchanges first, in creation order.
    pub fn endpoints(&self) -> Vec<EndpointDescriptor> {
        let registry = self.inner.registry.read();
        let exchanges = registry.exchanges.iter().map(|entry| EndpointDescriptor {
            kind: EndpointKind::Exchange,
            name: entry.name.clone(),
            scope: entry.scope,
            location: entry.location.clone(),
        });
        let queues = registry.queues.iter().map(|cell| EndpointDescriptor {
            kind: EndpointKind::Queue,
            name: cell.name.clone(),
            scope: cell.scope,
            location: cell.location.clone(),
        });
        exchanges.chain(queues).collect()
    }

    /// Exchanges currently bound to `queue`.
    pub fn sources(&self, queue: QueueId) -> WiringResult<Vec<ExchangeId>> {
        let registry = self.inner.registry.read();
        registry.queue(queue)?;
        Ok(registry.bindings.sources(queue))
    }

    pub fn queue_stats(&self, queue: QueueId) -> WiringResult<QueueStats> {
        Ok(self.inner.registry.read().queue(queue)?.stats())
    }

    /// Sends `message` through `exchange`.
    ///
    /// Returns `Ok(false)` when a non-blocking send is refused, either by flow
    /// control or because nothing is bound yet. A blocking send waits for both.
    pub fn send(&self, exchange: ExchangeId, message: Message, blocking: bool) -> WiringResult<bool> {
        let delivery = Delivery {
            source: exchange.raw(),
            message,
        };
        loop {
            self.ensure_open()?;
            let observed = self.inner.topology.observe();
            let (entry, targets) = self.inner.registry.read().route(exchange)?;

            if targets.is_empty() {
                if !blocking {
                    trace!(%exchange, "transport: send refused, no bindings");
                    return Ok(false);
                }
                trace!(%exchange, "transport: send waiting for a binding");
                self.inner.topology.wait_past(observed);
                continue;
            }

            let delivered = match entry.style {
                Style::DataDistribution if blocking => {
                    for cell in &targets {
                        cell.offer(&delivery, true)?;
                    }
                    true
                }
                Style::DataDistribution => QueueCell::offer_all(&targets, &delivery)?,
                Style::LoadBalancing => {
                    let reopened = self.inner.reopened.observe();
                    let admitted = self.balance(&entry, &targets, &delivery)?;
                    if !admitted && blocking {
                        // Re-route after any queue reopens; bindings may have changed too.
                        trace!(%exchange, "transport: send waiting for an admitting queue");
                        self.inner.reopened.wait_past(reopened);
                        continue;
                    }
                    admitted
                }
            };
            if delivered {
                self.inner.arrivals.notify_all();
            }
            trace!(%exchange, delivered, fanout = targets.len(), "transport: send");
            return Ok(delivered);
        }
    }

    /// Offers `delivery` to the first admitting queue in rotation order.
    fn balance(
        &self,
        entry: &ExchangeEntry,
        targets: &[Arc<QueueCell>],
        delivery: &Delivery,
    ) -> WiringResult<bool> {
        let count = targets.len();
        let start = entry.next_start(count);
        for step in 0..count {
            let cell = &targets[(start + step) % count];
            if cell.offer(delivery, false)?.is_admitted() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Non-blocking send that reports refusal as [`WiringError::QueueFull`].
    pub fn try_send(&self, exchange: ExchangeId, message: Message) -> WiringResult<()> {
        if self.send(exchange, message, false)? {
            Ok(())
        } else {
            Err(WiringError::QueueFull)
        }
    }

    /// Takes the oldest unmasked message from `queue`.
    pub fn receive(&self, queue: QueueId, blocking: bool) -> WiringResult<Option<Received>> {
        self.ensure_open()?;
        let cell = Arc::clone(self.inner.registry.read().queue(queue)?);
        let taken = cell.take(blocking, || self.current_mask())?;
        Ok(taken.map(|delivery| Received {
            queue,
            exchange: ExchangeId::from_raw(delivery.source),
            message: delivery.message,
        }))
    }

    /// Takes a message from whichever queue has one, rotating over queues
    /// so no single queue starves the others.
    pub fn receive_any(&self, blocking: bool) -> WiringResult<Option<Received>> {
        loop {
            self.ensure_open()?;
            let observed = self.inner.arrivals.observe();
            let cells = self.inner.registry.read().queues.clone();

            let count = cells.len();
            let start = self.inner.any_cursor.load(Ordering::Relaxed);
            for step in 0..count {
                let index = (start + step) % count;
                let cell = &cells[index];
                if let Some(delivery) = cell.take(false, || self.current_mask())? {
                    self.inner.any_cursor.store(index + 1, Ordering::Relaxed);
                    return Ok(Some(Received {
                        queue: cell.id,
                        exchange: ExchangeId::from_raw(delivery.source),
                        message: delivery.message,
                    }));
                }
            }

            if !blocking {
                return Ok(None);
            }
            self.inner.arrivals.wait_past(observed);
        }
    }

    /// Ends the session. Every parked sender and receiver wakes with
    /// [`WiringError::Closed`]. Calling it again does nothing.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Inner {
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut dropped = 0;
        {
            let registry = self.registry.read();
            for cell in &registry.queues {
                dropped += cell.close();
            }
        }
        self.arrivals.notify_all();
        self.topology.notify_all();
        self.reopened.notify_all();
        self.config.substrate.disconnect();
        if dropped > 0 {
            warn!(host = %self.host, dropped, "transport: closed with undelivered messages");
        } else {
            debug!(host = %self.host, "transport: closed");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.close();
    }
}
