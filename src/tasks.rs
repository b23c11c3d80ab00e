//! Worker-side handler for queued email tasks.
//!
//! The queued adapter submits `(recipient, subject, body)` as positional
//! arguments; a worker consuming that task calls [`send_email_generic`]
//! to rebuild a plain-text message and hand it to the direct transport.
//! Errors propagate to the queue runtime, which owns retry semantics for
//! queued work.

use std::str::FromStr;

use tracing::info;

use crate::{
    adapters::MailTransport,
    address::EmailAddress,
    message::RenderedMessage,
};

/// Rebuild a message from task arguments and submit it.
///
/// # Errors
///
/// Returns an error if the recipient fails address validation or the
/// transport rejects the message.
pub async fn send_email_generic(
    transport: &dyn MailTransport,
    sender: &EmailAddress,
    recipient: &str,
    subject: &str,
    body: &str,
) -> anyhow::Result<()> {
    let to = EmailAddress::from_str(recipient)?;
    let message = RenderedMessage {
        subject: subject.to_string(),
        to: to.clone(),
        from: sender.clone(),
        body: body.to_string(),
    };

    transport.submit(&to, &message).await?;
    info!(to = %to, "queued email task delivered");
    Ok(())
}
