//! In-process deferred adapter.
//!
//! Registers the send with a request-scoped collector that runs after the
//! HTTP response goes out. Registration is synchronous and non-blocking;
//! this adapter has no suspension point. Failures in the deferred
//! execution itself happen out of band and are not observable here.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    adapters::{Adapter, AdapterName},
    address::EmailAddress,
    error::SendError,
    message::{EmailPayload, RenderedMessage, SendResult},
    render::TemplateRenderer,
};

/// Request-scoped deferred-execution collector.
///
/// Implementations own the transport the deferred send will use; this
/// crate only hands over the recipient and the rendered message.
pub trait DeferredQueue: Send + Sync {
    /// Register a send to run after the current response is delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if registration itself fails; the adapter
    /// propagates it.
    fn register(&self, recipient: EmailAddress, message: RenderedMessage) -> anyhow::Result<()>;
}

pub struct DeferredAdapter {
    collector: Arc<dyn DeferredQueue>,
    renderer: TemplateRenderer,
}

impl DeferredAdapter {
    #[must_use]
    pub fn new(collector: Arc<dyn DeferredQueue>, renderer: TemplateRenderer) -> Self {
        Self {
            collector,
            renderer,
        }
    }
}

#[async_trait]
impl Adapter for DeferredAdapter {
    fn name(&self) -> AdapterName {
        AdapterName::Deferred
    }

    async fn send(&self, payload: &EmailPayload) -> Result<SendResult, SendError> {
        let message = self
            .renderer
            .render(&payload.template_id, &payload.to, &payload.template_vars)?;

        self.collector
            .register(payload.to.clone(), message)
            .map_err(SendError::Transport)?;

        info!(to = %payload.to, "email deferred to post-response execution");
        Ok(SendResult::handed_off(AdapterName::Deferred))
    }
}
