//! Typed error handling for send operations.
//!
//! The variants map onto the failure classes the chain executor cares
//! about:
//! - Configuration errors fail fast for one adapter without touching the
//!   network; the rest of the chain is still tried.
//! - Connectivity and protocol failures mean the transport was reachable
//!   or probed but delivery did not happen; the executor advances.
//! - Template and address errors abort before any transport is attempted.

use thiserror::Error;

use crate::{adapters::AdapterName, address::AddressError, render::TemplateError};

/// Top-level error for a send attempt, from a single adapter or from an
/// exhausted chain.
#[derive(Debug, Error)]
pub enum SendError {
    /// The recipient address failed validation; no payload was built.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// A required template variable was missing. Raised before any
    /// transport work.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Required transport credentials or settings are absent. The affected
    /// adapter fails without a network attempt.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A liveness probe or network-level operation failed.
    #[error("Connectivity failure: {0}")]
    Connectivity(String),

    /// The transport was reached but rejected the message.
    #[error("Protocol failure (status {status}): {body}")]
    Protocol { status: u16, body: String },

    /// A network-level HTTP error. Deliberately left unwrapped so callers
    /// can distinguish connectivity failure from protocol failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The underlying mail transport failed after in-adapter retries.
    #[error("Transport failure: {0}")]
    Transport(anyhow::Error),

    /// A chain named an adapter that is not in the registry. The chain is
    /// aborted at this point; later adapters are not tried.
    #[error("No adapter registered for `{0}`")]
    UnknownAdapter(AdapterName),

    /// Every adapter in the chain was tried and the final one reported a
    /// non-success result without raising.
    #[error("Delivery chain exhausted without a successful send")]
    Exhausted,
}

impl SendError {
    /// Returns `true` if the failure was a per-adapter configuration
    /// problem (credentials absent, adapter disabled).
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns `true` if the failure happened before any transport was
    /// attempted (invalid payload or template).
    #[must_use]
    pub const fn is_pre_transport(&self) -> bool {
        matches!(self, Self::Address(_) | Self::Template(_))
    }

    /// Returns `true` for network-level failures, including unwrapped
    /// HTTP client errors.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::Http(_))
    }
}
