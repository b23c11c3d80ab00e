//! Delivery policy: which adapters to try, in what order.
//!
//! The policy is a pure function of (purpose, priority) for a fixed
//! configuration. It holds no state across calls and never mutates the
//! chain after building it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::AdapterName;

/// The transport family the policy puts first in every chain.
///
/// An unrecognized selector string falls back to [`Provider::Smtp`]
/// without failing, so a misconfigured environment degrades to the
/// default ordering instead of breaking sends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum Provider {
    /// Queue-backed SMTP delivery first (the workers drain to SMTP).
    #[default]
    Smtp,
    /// Third-party HTTP API first.
    Mailgun,
}

impl From<&str> for Provider {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "mailgun" => Self::Mailgun,
            _ => Self::Smtp,
        }
    }
}

impl From<String> for Provider {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

/// Semantic category of a message, driving chain selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    QuizLink,
    Verification,
    PasswordReset,
    /// Anything unrecognized. Maps to the same safe default chain as
    /// [`Purpose::QuizLink`]; optional notification paths must not fail
    /// just because policy has no entry for them.
    Other,
}

impl From<&str> for Purpose {
    fn from(value: &str) -> Self {
        match value {
            "quiz_link" => Self::QuizLink,
            "verification" => Self::Verification,
            "password_reset" => Self::PasswordReset,
            _ => Self::Other,
        }
    }
}

/// Secondary policy dimension within a purpose. Only the default value is
/// observed today; the enum exists so future differentiation does not
/// change the signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Default,
}

/// Maps (purpose, priority) to an ordered adapter chain.
#[derive(Clone, Copy, Debug)]
pub struct DeliveryPolicy {
    provider: Provider,
}

impl DeliveryPolicy {
    #[must_use]
    pub const fn new(provider: Provider) -> Self {
        Self { provider }
    }

    /// The ordered, non-empty chain of adapters to try for a message.
    ///
    /// Time-sensitive purposes (verification, password reset) include the
    /// direct-synchronous fallback; routine notifications do not. When the
    /// configured provider is [`Provider::Mailgun`], the HTTP API adapter
    /// moves to the front and the purpose-specific remainder follows.
    #[must_use]
    pub fn chain_for(&self, purpose: Purpose, _priority: Priority) -> Vec<AdapterName> {
        let mut chain = match purpose {
            Purpose::Verification | Purpose::PasswordReset => vec![
                AdapterName::Queued,
                AdapterName::Deferred,
                AdapterName::Direct,
                AdapterName::HttpApi,
            ],
            Purpose::QuizLink | Purpose::Other => vec![
                AdapterName::Queued,
                AdapterName::Deferred,
                AdapterName::HttpApi,
            ],
        };

        if self.provider == Provider::Mailgun {
            if let Some(position) = chain.iter().position(|&name| name == AdapterName::HttpApi) {
                let primary = chain.remove(position);
                chain.insert(0, primary);
            }
        }

        debug!(?purpose, provider = ?self.provider, ?chain, "resolved delivery chain");
        chain
    }
}
