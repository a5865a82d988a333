//! Message payloads and the type filter applied at receive time.

use bytes::Bytes;

/// Wire code for [`MessageType::Data`].
pub const MESSAGE_DATA: u32 = 1;
/// Wire code for [`MessageType::Gap`].
pub const MESSAGE_GAP: u32 = 2;

/// Distinguishes regular payload deliveries from loss notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Regular payload.
    Data,
    /// A detected loss in the stream. The payload carries no meaning.
    Gap,
}

impl MessageType {
    /// Bit used for this type inside a [`MessageMask`].
    pub const fn bit(self) -> u32 {
        match self {
            MessageType::Data => MESSAGE_DATA,
            MessageType::Gap => MESSAGE_GAP,
        }
    }

    /// Decodes the single-type wire code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            MESSAGE_DATA => Some(MessageType::Data),
            MESSAGE_GAP => Some(MessageType::Gap),
            _ => None,
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        self.bit() as u8
    }

    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        Self::from_code(byte as u32)
    }
}

/// Immutable payload plus its type tag.
///
/// Cloning shares the underlying buffer, so fan-out hands every queue an
/// independent value without copying bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    kind: MessageType,
    payload: Bytes,
}

impl Message {
    /// Creates a data message. A zero-length payload is valid.
    pub fn data(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageType::Data,
            payload: payload.into(),
        }
    }

    /// Creates a gap notification with an empty payload.
    pub fn gap() -> Self {
        Self {
            kind: MessageType::Gap,
            payload: Bytes::new(),
        }
    }

    pub(crate) fn from_parts(kind: MessageType, payload: Bytes) -> Self {
        Self { kind, payload }
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload size as the unsigned byte count reported across boundaries.
    pub fn size(&self) -> u32 {
        self.payload.len() as u32
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

/// Set of message types surfaced by receive calls.
///
/// Data is always part of the mask: reception of data cannot be switched off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageMask(u32);

impl MessageMask {
    /// Only regular payloads (the default).
    pub const DATA_ONLY: Self = Self(MESSAGE_DATA);
    /// Payloads and gap notifications.
    pub const ALL: Self = Self(MESSAGE_DATA | MESSAGE_GAP);

    /// Builds a mask from OR-ed wire codes. Unknown bits are ignored.
    pub const fn from_bits(bits: u32) -> Self {
        Self((bits & (MESSAGE_DATA | MESSAGE_GAP)) | MESSAGE_DATA)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn allows(self, kind: MessageType) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl Default for MessageMask {
    fn default() -> Self {
        Self::DATA_ONLY
    }
}
