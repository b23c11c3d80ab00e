//! Message types that flow through the pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    address::{AddressError, EmailAddress},
    adapters::AdapterName,
};

/// Content type of every rendered message. The pipeline only produces
/// plain text, so template variables need no escaping.
pub const CONTENT_TYPE: &str = "text/plain";

/// An outbound email request, immutable once constructed.
///
/// Validation happens at construction: an invalid recipient address fails
/// [`EmailPayload::new`] and no partial payload exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPayload {
    /// Validated recipient address.
    pub to: EmailAddress,
    /// Key into the template table, e.g. `"verification"`.
    pub template_id: String,
    /// Variables interpolated into the template.
    pub template_vars: HashMap<String, String>,
}

impl EmailPayload {
    /// Build a payload, validating the recipient address.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] if `to` is not a syntactically valid
    /// email address.
    pub fn new(
        to: &str,
        template_id: impl Into<String>,
        template_vars: HashMap<String, String>,
    ) -> Result<Self, AddressError> {
        Ok(Self {
            to: to.parse()?,
            template_id: template_id.into(),
            template_vars,
        })
    }
}

/// A fully rendered message, produced fresh per send and discarded after.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub to: EmailAddress,
    pub from: EmailAddress,
    pub body: String,
}

impl RenderedMessage {
    /// Always [`CONTENT_TYPE`]; rendered messages are plain text only.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }
}

/// How strong the success claim of a [`SendResult`] is.
///
/// The queued and deferred transports report success once the message is
/// handed to another execution context; whether it is ever delivered is
/// not observable from here. That weaker claim is recorded explicitly
/// instead of being conflated with an accepted delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryGuarantee {
    /// The message was handed off for out-of-band delivery. Downstream
    /// failure is invisible to the caller.
    HandedOff,
    /// The transport itself accepted the message for delivery.
    Accepted,
}

/// Result of a non-exceptional send attempt.
///
/// Adapters may also fail by returning an error instead of `ok = false`;
/// the chain executor handles both the same way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendResult {
    /// Whether the attempt succeeded.
    pub ok: bool,
    /// The adapter that produced this result.
    pub adapter: AdapterName,
    /// Strength of the success claim. Meaningless when `ok` is false.
    pub guarantee: DeliveryGuarantee,
}

impl SendResult {
    /// Success meaning "delivery handed off", not "delivered".
    #[must_use]
    pub const fn handed_off(adapter: AdapterName) -> Self {
        Self {
            ok: true,
            adapter,
            guarantee: DeliveryGuarantee::HandedOff,
        }
    }

    /// Success meaning the transport accepted the message.
    #[must_use]
    pub const fn accepted(adapter: AdapterName) -> Self {
        Self {
            ok: true,
            adapter,
            guarantee: DeliveryGuarantee::Accepted,
        }
    }
}
