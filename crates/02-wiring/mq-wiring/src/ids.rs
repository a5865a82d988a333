//! Endpoint identifiers and the plain-value enums of the configuration surface.

use std::fmt;

use crate::WiringError;

pub const SCOPE_LOCAL: i32 = 1;
pub const SCOPE_PROCESS: i32 = 2;
pub const SCOPE_GLOBAL: i32 = 3;

pub const STYLE_DATA_DISTRIBUTION: i32 = 1;
pub const STYLE_LOAD_BALANCING: i32 = 2;

/// Index of an exchange inside the transport that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExchangeId(u32);

/// Index of a queue inside the transport that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId(u32);

macro_rules! arena_id {
    ($ty:ident, $label:literal) => {
        impl $ty {
            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }

            /// Raw value handed across plain-value boundaries.
            pub fn raw(self) -> u32 {
                self.0
            }

            /// Rebuilds an id from its raw value. Validity is checked on use.
            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

arena_id!(ExchangeId, "exchange");
arena_id!(QueueId, "queue");

/// Selects the delivery substrate beneath the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Same-process delivery.
    Local,
    /// Same-host, cross-process delivery.
    Process,
    /// Networked delivery.
    Global,
}

impl Scope {
    pub fn is_local(self) -> bool {
        self == Scope::Local
    }
}

impl TryFrom<i32> for Scope {
    type Error = WiringError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            SCOPE_LOCAL => Ok(Scope::Local),
            SCOPE_PROCESS => Ok(Scope::Process),
            SCOPE_GLOBAL => Ok(Scope::Global),
            _ => Err(WiringError::InvalidConfig("unknown scope code")),
        }
    }
}

/// How an exchange spreads messages over its bound queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Style {
    /// Every bound queue receives its own copy.
    DataDistribution,
    /// Exactly one bound queue receives each message.
    LoadBalancing,
}

impl TryFrom<i32> for Style {
    type Error = WiringError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            STYLE_DATA_DISTRIBUTION => Ok(Style::DataDistribution),
            STYLE_LOAD_BALANCING => Ok(Style::LoadBalancing),
            _ => Err(WiringError::InvalidConfig("unknown style code")),
        }
    }
}
