//! Transport configuration and the builder used to open a session.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use mq_flow::{FlowPolicy, MessageMask, Watermark};

use crate::ids::{Scope, Style};
use crate::substrate::{LoopbackSubstrate, Substrate};
use crate::transport::Transport;
use crate::WiringResult;

/// Session-wide settings applied when a transport is opened.
#[derive(Clone)]
pub struct TransportConfig {
    /// Directory for queue swap files. `None` uses the OS temp directory.
    pub swap_dir: Option<PathBuf>,
    /// Message types surfaced by receive calls until the next `mask` call.
    pub mask: MessageMask,
    /// Substrate that non-local endpoints are attached to.
    pub substrate: Arc<dyn Substrate>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            swap_dir: None,
            mask: MessageMask::default(),
            substrate: Arc::new(LoopbackSubstrate),
        }
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("swap_dir", &self.swap_dir)
            .field("mask", &self.mask)
            .field("substrate", &self.substrate.name())
            .finish()
    }
}

/// Builder for opening a [`Transport`] with non-default settings.
pub struct TransportBuilder {
    host: String,
    config: TransportConfig,
}

impl TransportBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            config: TransportConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Places queue swap files under `dir`.
    pub fn swap_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.swap_dir = Some(dir.into());
        self
    }

    /// Sets the initial receive mask.
    pub fn mask(mut self, mask: MessageMask) -> Self {
        self.config.mask = mask;
        self
    }

    /// Uses `substrate` for non-local endpoints.
    pub fn substrate<S>(mut self, substrate: S) -> Self
    where
        S: Substrate + 'static,
    {
        self.config.substrate = Arc::new(substrate);
        self
    }

    /// Connects to the host and returns the open session.
    pub fn open(self) -> WiringResult<Transport> {
        Transport::with_config(self.host, self.config)
    }
}

/// Creation parameters for an exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeSpec {
    pub scope: Scope,
    pub location: Option<String>,
    pub style: Style,
}

impl ExchangeSpec {
    pub fn new(scope: Scope, style: Style) -> Self {
        Self {
            scope,
            location: None,
            style,
        }
    }

    /// Same-process exchange with the given style.
    pub fn local(style: Style) -> Self {
        Self::new(Scope::Local, style)
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Creation parameters for a queue. Watermarks are validated at creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueSpec {
    pub scope: Scope,
    pub location: Option<String>,
    pub high_watermark: Watermark,
    pub low_watermark: Watermark,
    pub swap_bytes: u64,
}

impl QueueSpec {
    /// Unbounded queue without swap in the given scope.
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            location: None,
            high_watermark: Watermark::NoLimit,
            low_watermark: Watermark::NoLimit,
            swap_bytes: 0,
        }
    }

    pub fn local() -> Self {
        Self::new(Scope::Local)
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn watermarks(mut self, high: u64, low: u64) -> Self {
        self.high_watermark = Watermark::Limit(high);
        self.low_watermark = Watermark::Limit(low);
        self
    }

    pub fn swap(mut self, bytes: u64) -> Self {
        self.swap_bytes = bytes;
        self
    }

    pub(crate) fn policy(&self) -> WiringResult<FlowPolicy> {
        Ok(FlowPolicy::new(
            self.high_watermark,
            self.low_watermark,
            self.swap_bytes,
        )?)
    }
}
