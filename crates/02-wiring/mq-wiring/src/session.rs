//! Plain-value facade over [`Transport`].
//!
//! Endpoints are named by strings, ids and codes are integers, and payloads
//! are byte slices. Every call fails with [`WiringError::NotInitialized`]
//! until [`Session::open`] succeeds and with [`WiringError::Closed`] after
//! [`Session::destroy`].

use bytes::Bytes;
use tracing::debug;

use mq_flow::{Message, MessageMask, Watermark};

use crate::config::{ExchangeSpec, QueueSpec};
use crate::ids::{ExchangeId, Scope, Style};
use crate::transport::Transport;
use crate::{WiringError, WiringResult};

/// A received message in plain-value form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    pub queue: i32,
    pub exchange: i32,
    pub data: Vec<u8>,
    /// One of [`mq_flow::MESSAGE_DATA`] or [`mq_flow::MESSAGE_GAP`].
    pub kind: u32,
}

#[derive(Default)]
enum SessionState {
    #[default]
    Unopened,
    Open(Transport),
    Destroyed,
}

#[derive(Default)]
pub struct Session {
    state: SessionState,
}

fn optional(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}

fn raw_id(raw: u32) -> i32 {
    raw as i32
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects to `host`. A failed open leaves the session unopened.
    pub fn open(&mut self, host: &str) -> WiringResult<()> {
        match &self.state {
            SessionState::Open(_) => return Ok(()),
            SessionState::Destroyed => return Err(WiringError::Closed),
            SessionState::Unopened => {}
        }
        let transport = Transport::open(host)?;
        self.state = SessionState::Open(transport);
        Ok(())
    }

    fn transport(&self) -> WiringResult<&Transport> {
        match &self.state {
            SessionState::Open(transport) => Ok(transport),
            SessionState::Unopened => Err(WiringError::NotInitialized),
            SessionState::Destroyed => Err(WiringError::Closed),
        }
    }

    /// Borrows the typed transport behind the facade.
    pub fn as_transport(&self) -> WiringResult<&Transport> {
        self.transport()
    }

    pub fn mask(&self, bits: u32) -> WiringResult<()> {
        self.transport()?.mask(MessageMask::from_bits(bits))
    }

    pub fn create_exchange(
        &self,
        name: &str,
        scope: i32,
        location: &str,
        style: i32,
    ) -> WiringResult<i32> {
        let spec = ExchangeSpec {
            scope: Scope::try_from(scope)?,
            location: optional(location),
            style: Style::try_from(style)?,
        };
        let id = self.transport()?.create_exchange(name, spec)?;
        Ok(raw_id(id.raw()))
    }

    /// Creates a queue. Negative watermarks mean no limit; a non-positive
    /// swap size disables swap.
    pub fn create_queue(
        &self,
        name: &str,
        scope: i32,
        location: &str,
        hwm: i64,
        lwm: i64,
        swap: i64,
    ) -> WiringResult<i32> {
        let spec = QueueSpec {
            scope: Scope::try_from(scope)?,
            location: optional(location),
            high_watermark: Watermark::from_raw(hwm),
            low_watermark: Watermark::from_raw(lwm),
            swap_bytes: swap.max(0) as u64,
        };
        let id = self.transport()?.create_queue(name, spec)?;
        Ok(raw_id(id.raw()))
    }

    /// Binds by name. Empty argument strings are treated as absent.
    pub fn bind(
        &self,
        exchange: &str,
        queue: &str,
        exchange_args: &str,
        queue_args: &str,
    ) -> WiringResult<()> {
        self.transport()?.bind(
            exchange,
            queue,
            optional(exchange_args).as_deref(),
            optional(queue_args).as_deref(),
        )
    }

    /// Sends a copy of `data` as a data message.
    pub fn send(&self, exchange: i32, data: &[u8], block: bool) -> WiringResult<bool> {
        let transport = self.transport()?;
        let exchange = u32::try_from(exchange)
            .map(ExchangeId::from_raw)
            .map_err(|_| WiringError::unknown(exchange))?;
        transport.send(exchange, Message::data(Bytes::copy_from_slice(data)), block)
    }

    /// Receives from any queue of the session.
    pub fn receive(&self, block: bool) -> WiringResult<Option<RawMessage>> {
        let received = self.transport()?.receive_any(block)?;
        Ok(received.map(|received| RawMessage {
            queue: raw_id(received.queue.raw()),
            exchange: raw_id(received.exchange.raw()),
            kind: received.message.kind().bit(),
            data: received.message.into_payload().to_vec(),
        }))
    }

    /// Closes the transport. Later calls fail with `Closed`; destroying twice
    /// is harmless.
    pub fn destroy(&mut self) {
        if let SessionState::Open(transport) =
            std::mem::replace(&mut self.state, SessionState::Destroyed)
        {
            debug!(host = transport.host(), "session: destroyed");
            transport.close();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.destroy();
    }
}
