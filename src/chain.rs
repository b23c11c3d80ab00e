//! Chain executor: ordered fallback across transport adapters.
//!
//! The executor tries each adapter in the supplied order and stops at the
//! first success. It never reorders the chain and never calls more
//! adapters than needed; parallel attempts could double-send. A failed
//! adapter (error or `ok = false`) is recorded and the next one is tried.
//! Exhausting the chain surfaces the last failure.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, warn};

use crate::{
    adapters::{Adapter, AdapterName},
    error::SendError,
    message::{EmailPayload, SendResult},
};

/// Mapping from adapter token to adapter instance, assembled once at
/// composition time and read-only afterwards.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<AdapterName, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(adapter.name(), adapter);
    }

    #[must_use]
    pub fn get(&self, name: AdapterName) -> Option<&Arc<dyn Adapter>> {
        self.adapters.get(&name)
    }

    #[must_use]
    pub fn contains(&self, name: AdapterName) -> bool {
        self.adapters.contains_key(&name)
    }

    /// The registered adapter tokens, in no particular order.
    #[must_use]
    pub fn names(&self) -> Vec<AdapterName> {
        self.adapters.keys().copied().collect()
    }
}

/// Executes a delivery chain against a registry.
pub struct ChainExecutor {
    registry: AdapterRegistry,
}

impl ChainExecutor {
    #[must_use]
    pub fn new(registry: AdapterRegistry) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Try each adapter in `chain` until one reports success.
    ///
    /// # Errors
    ///
    /// - [`SendError::UnknownAdapter`] if a token has no registered
    ///   adapter; the chain is aborted at that point, nothing after it is
    ///   tried.
    /// - Otherwise, the last adapter's error once the chain is exhausted,
    ///   or [`SendError::Exhausted`] when the final adapter returned a
    ///   non-success result without an error.
    pub async fn send(
        &self,
        payload: &EmailPayload,
        chain: &[AdapterName],
    ) -> Result<SendResult, SendError> {
        let mut last_err: Option<SendError> = None;

        for &name in chain {
            let Some(adapter) = self.registry.get(name) else {
                return Err(SendError::UnknownAdapter(name));
            };

            debug!(adapter = %name, "attempting delivery");
            match adapter.send(payload).await {
                Ok(result) if result.ok => {
                    debug!(adapter = %name, "delivery succeeded");
                    return Ok(result);
                }
                Ok(_) => {
                    warn!(adapter = %name, "adapter reported non-success, trying next");
                    last_err = Some(SendError::Exhausted);
                }
                Err(err) => {
                    warn!(adapter = %name, error = %err, "adapter failed, trying next");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or(SendError::Exhausted))
    }
}
