//! Transport adapters.
//!
//! Each adapter wraps one delivery mechanism behind the uniform
//! [`Adapter::send`] contract. The set of adapters is closed: dispatch is
//! by [`AdapterName`], a tagged token, never by open-ended string keys.
//!
//! Adapters fail by returning an error; they never report failure as
//! success. The queued and deferred adapters do the inverse asymmetry on
//! purpose: their success only means the message was handed off (see
//! [`DeliveryGuarantee`](crate::message::DeliveryGuarantee)).

mod deferred;
mod direct;
mod http_api;
mod queued;

use std::fmt::{self, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use deferred::{DeferredAdapter, DeferredQueue};
pub use direct::{DirectAdapter, MailTransport};
pub use http_api::HttpApiAdapter;
pub use queued::{QueuedAdapter, TaskQueue, TaskSubmission};

use crate::{error::SendError, message::EmailPayload, message::SendResult};

/// Token identifying one transport adapter. The set is fixed; chains are
/// sequences of these tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterName {
    /// Task-queue submission drained by external workers.
    Queued,
    /// Request-scoped deferred execution, after the response is sent.
    Deferred,
    /// Synchronous SMTP submission with in-adapter retry.
    Direct,
    /// Third-party transactional email HTTP API.
    HttpApi,
}

impl Display for AdapterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Queued => "queued",
            Self::Deferred => "deferred",
            Self::Direct => "direct",
            Self::HttpApi => "http-api",
        })
    }
}

/// Uniform send contract over heterogeneous transports.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The token this adapter is registered under.
    fn name(&self) -> AdapterName;

    /// Attempt to send the payload over this transport.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] describing the transport-specific cause on
    /// unrecoverable failure. A returned `Ok` with `ok = true` means this
    /// transport's own success criterion was met, which for hand-off
    /// transports is weaker than confirmed delivery.
    async fn send(&self, payload: &EmailPayload) -> Result<SendResult, SendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_render_as_kebab_case() {
        assert_eq!(AdapterName::Queued.to_string(), "queued");
        assert_eq!(AdapterName::Deferred.to_string(), "deferred");
        assert_eq!(AdapterName::Direct.to_string(), "direct");
        assert_eq!(AdapterName::HttpApi.to_string(), "http-api");
    }
}
