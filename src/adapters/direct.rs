//! Direct-synchronous adapter.
//!
//! Hands the rendered message to a low-level mail-submission primitive
//! with in-adapter retry: a fixed attempt count and exponential backoff
//! between attempts. The backoff is a timer suspension, not a thread
//! sleep, so unrelated work sharing the scheduler keeps running while the
//! attempts themselves stay strictly sequential.
//!
//! This is the only adapter that retries within its own transport; retry
//! across transports belongs to the chain executor.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    adapters::{Adapter, AdapterName},
    address::EmailAddress,
    config::RetryPolicy,
    error::SendError,
    message::{EmailPayload, RenderedMessage, SendResult},
    render::TemplateRenderer,
};

/// Synchronous mail-submission primitive. No built-in retry; retry is
/// this adapter's responsibility.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Submit one message to one recipient.
    async fn submit(
        &self,
        recipient: &EmailAddress,
        message: &RenderedMessage,
    ) -> anyhow::Result<()>;
}

pub struct DirectAdapter {
    transport: Arc<dyn MailTransport>,
    renderer: TemplateRenderer,
    retry: RetryPolicy,
}

impl DirectAdapter {
    #[must_use]
    pub fn new(
        transport: Arc<dyn MailTransport>,
        renderer: TemplateRenderer,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            renderer,
            retry,
        }
    }
}

#[async_trait]
impl Adapter for DirectAdapter {
    fn name(&self) -> AdapterName {
        AdapterName::Direct
    }

    async fn send(&self, payload: &EmailPayload) -> Result<SendResult, SendError> {
        let message = self
            .renderer
            .render(&payload.template_id, &payload.to, &payload.template_vars)?;

        let mut last_err = None;
        for attempt in 0..self.retry.max_attempts {
            match self.transport.submit(&payload.to, &message).await {
                Ok(()) => {
                    info!(to = %payload.to, attempt, "email submitted directly");
                    return Ok(SendResult::accepted(AdapterName::Direct));
                }
                Err(err) => {
                    warn!(
                        to = %payload.to,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "direct submission failed"
                    );
                    last_err = Some(err);

                    if attempt + 1 < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
                    }
                }
            }
        }

        Err(match last_err {
            Some(err) => SendError::Transport(err),
            // max_attempts of zero never reached the transport.
            None => SendError::Configuration("retry policy allows no attempts".to_string()),
        })
    }
}
