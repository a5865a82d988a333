//! Seam to the delivery substrate that sits beneath non-local endpoints.
//!
//! The wiring model (registries, bindings, flow control) is identical for every
//! scope. What differs is whether the endpoint must be made reachable from
//! other processes or hosts, which is the substrate's job.

use std::fmt;

use crate::ids::Scope;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointKind {
    Exchange,
    Queue,
}

/// Describes an endpoint being announced to the substrate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub kind: EndpointKind,
    pub name: String,
    pub scope: Scope,
    pub location: Option<String>,
}

/// Failure reported by a substrate; surfaces as a connection error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubstrateError(pub String);

impl fmt::Display for SubstrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SubstrateError {}

pub trait Substrate: Send + Sync {
    /// Establishes the session with `host`.
    fn connect(&self, host: &str) -> Result<(), SubstrateError>;

    /// Makes a non-local endpoint reachable through the substrate.
    fn attach(&self, endpoint: &EndpointDescriptor) -> Result<(), SubstrateError>;

    /// Releases everything attached during the session. Defaults to a no-op.
    fn disconnect(&self) {}

    fn name(&self) -> &'static str;
}

/// In-process substrate serving all three scopes from the current process.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoopbackSubstrate;

impl Substrate for LoopbackSubstrate {
    fn connect(&self, host: &str) -> Result<(), SubstrateError> {
        if host.trim().is_empty() {
            return Err(SubstrateError("empty host".into()));
        }
        Ok(())
    }

    fn attach(&self, _endpoint: &EndpointDescriptor) -> Result<(), SubstrateError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}
