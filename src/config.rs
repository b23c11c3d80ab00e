//! Mailer configuration resolved once at composition time.
//!
//! Configuration is read from the environment (or a TOML document) into a
//! plain value that is passed by reference into the service builder. Deep
//! call paths never consult the environment themselves; test isolation is
//! a fresh [`MailerConfig::from_env`] call, not mutation of shared state.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::{address::EmailAddress, policy::Provider};

/// Error building a [`MailerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Required environment variable {0} is not set")]
    MissingVar(&'static str),

    /// A variable was present but unusable.
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    /// The TOML document could not be parsed.
    #[error("Configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration for the email pipeline.
#[derive(Clone, Debug, Deserialize)]
pub struct MailerConfig {
    /// Fixed sender address stamped on every rendered message.
    pub sender: EmailAddress,

    /// Which transport the delivery policy tries first.
    #[serde(default)]
    pub provider: Provider,

    /// Base URL used to build absolute links in rendered bodies.
    #[serde(default = "defaults::allowed_origin")]
    pub allowed_origin: String,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub http_api: HttpApiConfig,
}

/// Settings for the queued-task adapter.
#[derive(Clone, Debug, Deserialize)]
pub struct QueueConfig {
    /// Named queue that submissions are routed to.
    #[serde(default = "defaults::queue_name")]
    pub name: String,

    /// Task name submitted to the queue, consumed by
    /// [`tasks::send_email_generic`](crate::tasks::send_email_generic)
    /// on the worker side.
    #[serde(default = "defaults::task_name")]
    pub task_name: String,

    /// Bound on the worker liveness probe, independent of any caller
    /// timeout around the whole send.
    #[serde(default = "defaults::probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl QueueConfig {
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: defaults::queue_name(),
            task_name: defaults::task_name(),
            probe_timeout_secs: defaults::probe_timeout_secs(),
        }
    }
}

/// Retry policy for the direct-synchronous adapter.
///
/// Retry across different transports is the chain executor's job; this
/// policy only governs attempts within the direct adapter.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts before the last transport error is surfaced.
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in seconds; the delay doubles after each
    /// failed attempt: `base * 2^attempt`.
    #[serde(default = "defaults::base_delay_secs")]
    pub base_delay_secs: u64,
}

impl RetryPolicy {
    /// Backoff delay after the given zero-indexed failed attempt.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let secs = if attempt >= 63 {
            u64::MAX
        } else {
            self.base_delay_secs.saturating_mul(1u64 << attempt)
        };
        Duration::from_secs(secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_delay_secs: defaults::base_delay_secs(),
        }
    }
}

/// Settings for the third-party HTTP API adapter.
///
/// The credentials are optional on purpose: when either is absent the
/// adapter fails fast with a configuration error and the chain moves on.
#[derive(Clone, Debug, Deserialize)]
pub struct HttpApiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sending domain registered with the provider.
    #[serde(default)]
    pub domain: Option<String>,

    /// From-address override for this transport only. Falls back to the
    /// pipeline-wide sender when unset.
    #[serde(default)]
    pub sender: Option<EmailAddress>,

    /// API base URL, overridable for tests.
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Probe the provider once at startup to warm the connection pool.
    #[serde(default = "defaults::warmup")]
    pub warmup: bool,

    /// Per-request timeout for API calls.
    #[serde(default = "defaults::http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            domain: None,
            sender: None,
            api_base: defaults::api_base(),
            warmup: defaults::warmup(),
            timeout_secs: defaults::http_timeout_secs(),
        }
    }
}

mod defaults {
    pub fn allowed_origin() -> String {
        "http://localhost:3000".to_string()
    }

    pub fn queue_name() -> String {
        "email".to_string()
    }

    pub fn task_name() -> String {
        "send_email_generic".to_string()
    }

    pub const fn probe_timeout_secs() -> u64 {
        1
    }

    pub const fn max_attempts() -> u32 {
        3
    }

    pub const fn base_delay_secs() -> u64 {
        2
    }

    pub fn api_base() -> String {
        "https://api.mailgun.net/v3".to_string()
    }

    pub const fn warmup() -> bool {
        true
    }

    pub const fn http_timeout_secs() -> u64 {
        10
    }
}

impl MailerConfig {
    /// Build the configuration from process environment variables.
    ///
    /// This is an explicit, side-effect-free derivation: calling it again
    /// (e.g. per test) re-reads the environment and produces a fresh,
    /// independent value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `SENDER_EMAIL` is unset or any present
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let sender: EmailAddress = require_env("SENDER_EMAIL")?
            .parse()
            .map_err(|err| invalid("SENDER_EMAIL", &err))?;

        let provider = std::env::var("PRIMARY_EMAIL_PROVIDER")
            .map(|value| Provider::from(value.as_str()))
            .unwrap_or_default();

        // The first configured origin is the base for links in bodies.
        let allowed_origin = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .and_then(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .find(|origin| !origin.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(defaults::allowed_origin);

        let mut queue = QueueConfig::default();
        if let Ok(name) = std::env::var("EMAIL_QUEUE") {
            queue.name = name;
        }

        let retry = RetryPolicy {
            max_attempts: parse_env("MAX_RETRIES")?.unwrap_or_else(defaults::max_attempts),
            base_delay_secs: parse_env("RETRY_DELAY")?.unwrap_or_else(defaults::base_delay_secs),
        };

        let domain = std::env::var("MAILGUN_DOMAIN").ok();
        let http_sender = match std::env::var("MAILGUN_SENDER_EMAIL") {
            Ok(value) => Some(
                value
                    .parse()
                    .map_err(|err| invalid("MAILGUN_SENDER_EMAIL", &err))?,
            ),
            Err(_) => domain
                .as_deref()
                .and_then(|domain| format!("no-reply@{domain}").parse().ok()),
        };

        let http_api = HttpApiConfig {
            api_key: std::env::var("MAILGUN_API_KEY").ok(),
            domain,
            sender: http_sender,
            warmup: std::env::var("MAILGUN_WARMUP").map_or(defaults::warmup(), |v| v == "1"),
            ..HttpApiConfig::default()
        };

        Ok(Self {
            sender,
            provider,
            allowed_origin,
            queue,
            retry,
            http_api,
        })
    }

    /// Build the configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed or a
    /// field fails validation.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }
}

fn require_env(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingVar(var))
}

fn parse_env<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) => value.parse().map(Some).map_err(|err| invalid(var, &err)),
        Err(_) => Ok(None),
    }
}

fn invalid(var: &'static str, reason: &impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.base_delay_secs, 2);

        let queue = QueueConfig::default();
        assert_eq!(queue.name, "email");
        assert_eq!(queue.task_name, "send_email_generic");
        assert_eq!(queue.probe_timeout(), Duration::from_secs(1));

        let http = HttpApiConfig::default();
        assert!(http.api_key.is_none());
        assert!(http.warmup);
        assert_eq!(http.api_base, "https://api.mailgun.net/v3");
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay_secs: 2,
        };
        assert_eq!(retry.backoff_delay(0), Duration::from_secs(2));
        assert_eq!(retry.backoff_delay(1), Duration::from_secs(4));
        assert_eq!(retry.backoff_delay(2), Duration::from_secs(8));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let retry = RetryPolicy {
            max_attempts: u32::MAX,
            base_delay_secs: u64::MAX / 2,
        };
        assert_eq!(retry.backoff_delay(80), Duration::from_secs(u64::MAX));
        assert_eq!(retry.backoff_delay(5), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn from_toml_parses_full_document() {
        let config = MailerConfig::from_toml_str(
            r#"
            sender = "no-reply@quizvault.test"
            provider = "mailgun"
            allowed_origin = "https://quizvault.test"

            [queue]
            name = "notifications"

            [retry]
            max_attempts = 5

            [http_api]
            api_key = "key-123"
            domain = "mg.quizvault.test"
            "#,
        )
        .unwrap();

        assert_eq!(config.sender.as_str(), "no-reply@quizvault.test");
        assert_eq!(config.provider, Provider::Mailgun);
        assert_eq!(config.allowed_origin, "https://quizvault.test");
        assert_eq!(config.queue.name, "notifications");
        assert_eq!(config.queue.task_name, "send_email_generic");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.http_api.domain.as_deref(), Some("mg.quizvault.test"));
    }

    #[test]
    fn from_toml_rejects_invalid_sender() {
        let err = MailerConfig::from_toml_str(r#"sender = "not-an-email""#);
        assert!(err.is_err());
    }

    // Single test for all MAILGUN_WARMUP states: env mutation must not
    // race with other from_env calls, and no other test reads the
    // environment.
    #[test]
    fn warmup_env_switch_is_one_or_off() {
        unsafe {
            std::env::set_var("SENDER_EMAIL", "test-sender@example.com");

            std::env::set_var("MAILGUN_WARMUP", "1");
            assert!(MailerConfig::from_env().unwrap().http_api.warmup);

            std::env::set_var("MAILGUN_WARMUP", "0");
            assert!(!MailerConfig::from_env().unwrap().http_api.warmup);

            // Anything other than "1" disables the probe.
            std::env::set_var("MAILGUN_WARMUP", "yes");
            assert!(!MailerConfig::from_env().unwrap().http_api.warmup);

            std::env::remove_var("MAILGUN_WARMUP");
            assert!(MailerConfig::from_env().unwrap().http_api.warmup);

            std::env::remove_var("SENDER_EMAIL");
        }
    }
}
