//! Email service composition root.
//!
//! Binds the delivery policy, the adapter registry, and the chain
//! executor behind the one entry point the rest of the system calls:
//! [`EmailService::send_email`]. Verification, password-reset, and
//! quiz-sharing flows all come through here; nothing calls an adapter
//! directly.

use std::sync::Arc;

use tracing::debug;

use crate::{
    adapters::{
        Adapter, AdapterName, DeferredAdapter, DeferredQueue, DirectAdapter, HttpApiAdapter,
        MailTransport, QueuedAdapter, TaskQueue,
    },
    chain::{AdapterRegistry, ChainExecutor},
    config::MailerConfig,
    error::SendError,
    message::{EmailPayload, SendResult},
    policy::{DeliveryPolicy, Priority, Purpose},
    render::TemplateRenderer,
};

pub struct EmailService {
    executor: ChainExecutor,
    policy: DeliveryPolicy,
    http_api: Arc<HttpApiAdapter>,
}

impl EmailService {
    #[must_use]
    pub const fn new(
        executor: ChainExecutor,
        policy: DeliveryPolicy,
        http_api: Arc<HttpApiAdapter>,
    ) -> Self {
        Self {
            executor,
            policy,
            http_api,
        }
    }

    /// Probe the HTTP API provider once to warm its connection pool.
    ///
    /// Call after composition, before serving traffic. Best effort: a
    /// failed or disabled probe is logged and never fatal.
    pub async fn warm_up(&self) {
        self.http_api.warm_up().await;
    }

    /// Send one email: validate the payload, resolve the delivery chain
    /// for its purpose, and run the chain until an adapter succeeds.
    ///
    /// A returned error means "email not sent"; callers decide whether
    /// that is fatal to the operation the email was attached to. All
    /// sends here are best effort relative to their triggering action.
    ///
    /// # Errors
    ///
    /// Propagates payload validation failure, template failure, or the
    /// chain's final error once every adapter has been tried.
    pub async fn send_email(
        &self,
        to: &str,
        template_id: &str,
        template_vars: std::collections::HashMap<String, String>,
        purpose: &str,
        priority: Priority,
    ) -> Result<SendResult, SendError> {
        let payload = EmailPayload::new(to, template_id, template_vars)?;
        let chain = self.policy.chain_for(Purpose::from(purpose), priority);

        debug!(to = %payload.to, purpose, ?chain, "dispatching email");
        self.executor.send(&payload, &chain).await
    }

    /// Tokens of the adapters this service was built with.
    #[must_use]
    pub fn adapters(&self) -> Vec<AdapterName> {
        self.executor.registry().names()
    }
}

/// Builder for [`EmailService`].
///
/// The queued, direct, and HTTP API adapters are always registered; the
/// deferred adapter only when a request-scoped collector is supplied,
/// since there is nothing to defer to outside a request.
pub struct EmailServiceBuilder {
    config: MailerConfig,
    task_queue: Arc<dyn TaskQueue>,
    transport: Arc<dyn MailTransport>,
    deferred: Option<Arc<dyn DeferredQueue>>,
}

impl EmailServiceBuilder {
    #[must_use]
    pub fn new(
        config: MailerConfig,
        task_queue: Arc<dyn TaskQueue>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            config,
            task_queue,
            transport,
            deferred: None,
        }
    }

    /// Attach a request-scoped deferred-execution collector.
    #[must_use]
    pub fn with_deferred_queue(mut self, collector: Arc<dyn DeferredQueue>) -> Self {
        self.deferred = Some(collector);
        self
    }

    /// Assemble the service: one renderer shared by all adapters, a fixed
    /// registry snapshot, and a policy bound to the configured provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP API adapter's client cannot be built.
    pub fn build(self) -> Result<EmailService, SendError> {
        let renderer = TemplateRenderer::new(
            self.config.sender.clone(),
            self.config.allowed_origin.clone(),
        );

        let mut registry = AdapterRegistry::new();

        registry.insert(Arc::new(QueuedAdapter::new(
            self.task_queue,
            renderer.clone(),
            self.config.queue.clone(),
        )));

        if let Some(collector) = self.deferred {
            registry.insert(Arc::new(DeferredAdapter::new(collector, renderer.clone())));
        }

        registry.insert(Arc::new(DirectAdapter::new(
            self.transport,
            renderer.clone(),
            self.config.retry,
        )));

        // Kept as a concrete handle too: `warm_up` is not part of the
        // uniform send contract.
        let http_api = Arc::new(HttpApiAdapter::new(
            self.config.http_api.clone(),
            renderer,
            self.config.sender.clone(),
        )?);
        registry.insert(Arc::clone(&http_api) as Arc<dyn Adapter>);

        let policy = DeliveryPolicy::new(self.config.provider);
        Ok(EmailService::new(
            ChainExecutor::new(registry),
            policy,
            http_api,
        ))
    }
}
