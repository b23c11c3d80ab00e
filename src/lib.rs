//! Policy-driven email delivery with ordered transport fallback
//!
//! This crate provides the outbound email pipeline for a web backend:
//! - Render a message from a template id and variables
//! - Select an ordered chain of transport adapters based on the message
//!   purpose and priority
//! - Try each adapter in order until one succeeds, aggregating failures
//!
//! The entry point for callers is [`EmailService::send_email`]; everything
//! else exists to serve it. Concrete transports (task queue, deferred
//! collector, SMTP submission) live behind the collaborator traits in
//! [`adapters`] so the pipeline can be exercised without any network.

pub mod adapters;
mod address;
mod chain;
mod config;
mod error;
pub mod logging;
mod message;
mod policy;
mod render;
mod service;
pub mod tasks;

pub use adapters::{Adapter, AdapterName, TaskSubmission};
pub use address::{AddressError, EmailAddress};
pub use chain::{AdapterRegistry, ChainExecutor};
pub use config::{ConfigError, HttpApiConfig, MailerConfig, QueueConfig, RetryPolicy};
pub use error::SendError;
pub use message::{DeliveryGuarantee, EmailPayload, RenderedMessage, SendResult};
pub use policy::{DeliveryPolicy, Priority, Provider, Purpose};
pub use render::{TemplateError, TemplateRenderer};
pub use service::{EmailService, EmailServiceBuilder};
