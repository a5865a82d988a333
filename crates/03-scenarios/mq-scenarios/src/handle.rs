use mq_wiring::{ExchangeId, Message, Transport, WiringResult};

use crate::sequence_payload;

/// Producer-side access to whatever the scenario sends through.
pub trait ProducerHandle: Send {
    /// Attempts a non-blocking send of `seq`; `Ok(false)` means refused.
    fn try_send(&mut self, seq: u32) -> WiringResult<bool>;
}

/// Sends sequence numbers through one exchange of a [`Transport`].
pub struct TransportHandle {
    transport: Transport,
    exchange: ExchangeId,
}

impl TransportHandle {
    pub fn new(transport: Transport, exchange: ExchangeId) -> Self {
        Self {
            transport,
            exchange,
        }
    }
}

impl ProducerHandle for TransportHandle {
    fn try_send(&mut self, seq: u32) -> WiringResult<bool> {
        let payload = sequence_payload(seq).to_vec();
        self.transport.send(self.exchange, Message::data(payload), false)
    }
}
