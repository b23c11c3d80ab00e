//! Template rendering.
//!
//! A renderer is a pure function of its inputs: the same template id and
//! variables always produce the same [`RenderedMessage`], and nothing is
//! cached or persisted. Each known template declares a fixed set of
//! required variables; a missing one fails before any transport is
//! attempted. Unknown template ids do not fail, they degrade to a bare
//! "Notification" subject with an empty body.

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::{address::EmailAddress, message::RenderedMessage};

/// Path appended to the allowed origin for verification links.
const VERIFY_PATH: &str = "/auth/verify-email/";
/// Path appended to the allowed origin for password reset links.
const RESET_PATH: &str = "/auth/reset-password/";

/// Error rendering a template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A variable the template requires was not supplied. Deliberate
    /// strictness: callers must pass the documented set in full.
    #[error("Missing required template variable `{key}` for template `{template}`")]
    MissingVariable { template: String, key: String },
}

/// Renders a template id plus variables into a plain-text message.
///
/// Required variables per template:
/// - `quiz_link`: `title`, `description`, `link`
/// - `verification`: `code`, `token`
/// - `password_reset`: `code`, `token`
/// - `custom`: `subject`, `body`
#[derive(Clone, Debug)]
pub struct TemplateRenderer {
    sender: EmailAddress,
    origin: String,
}

impl TemplateRenderer {
    #[must_use]
    pub fn new(sender: EmailAddress, origin: impl Into<String>) -> Self {
        Self {
            sender,
            origin: origin.into(),
        }
    }

    /// Render `template_id` for `to` with the given variables.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] naming the first absent
    /// required variable.
    pub fn render(
        &self,
        template_id: &str,
        to: &EmailAddress,
        vars: &HashMap<String, String>,
    ) -> Result<RenderedMessage, TemplateError> {
        let (subject, body) = match template_id {
            "quiz_link" => {
                let title = required(template_id, vars, "title")?;
                let description = required(template_id, vars, "description")?;
                let link = required(template_id, vars, "link")?;
                (
                    format!("Check out this quiz: {title}"),
                    format!("{title}\n\n{description}\n\nTake the quiz here: {link}\n"),
                )
            }
            "verification" => {
                let code = required(template_id, vars, "code")?;
                let token = required(template_id, vars, "token")?;
                let link = self.absolute_link(VERIFY_PATH, token);
                (
                    "Verify your email address".to_string(),
                    format!(
                        "Your verification code is {code}.\n\n\
                         Or verify your address directly:\n{link}\n"
                    ),
                )
            }
            "password_reset" => {
                let code = required(template_id, vars, "code")?;
                let token = required(template_id, vars, "token")?;
                let link = self.absolute_link(RESET_PATH, token);
                (
                    "Reset your password".to_string(),
                    format!(
                        "Your password reset code is {code}.\n\n\
                         Or reset your password directly:\n{link}\n"
                    ),
                )
            }
            "custom" => {
                let subject = required(template_id, vars, "subject")?;
                let body = required(template_id, vars, "body")?;
                (subject.to_string(), body.to_string())
            }
            unknown => {
                // Unknown ids degrade to an empty notification instead of
                // failing; optional notification paths rely on this.
                warn!(template_id = unknown, "unknown template id, using default notification");
                ("Notification".to_string(), String::new())
            }
        };

        Ok(RenderedMessage {
            subject,
            to: to.clone(),
            from: self.sender.clone(),
            body,
        })
    }

    /// Absolute link built from the configured origin, a fixed path, and
    /// the token as a query parameter. No other substitution or escaping;
    /// bodies are plain text.
    fn absolute_link(&self, path: &str, token: &str) -> String {
        format!("{}{path}?token={token}", self.origin.trim_end_matches('/'))
    }
}

fn required<'vars>(
    template: &str,
    vars: &'vars HashMap<String, String>,
    key: &str,
) -> Result<&'vars str, TemplateError> {
    vars.get(key)
        .map(String::as_str)
        .ok_or_else(|| TemplateError::MissingVariable {
            template: template.to_string(),
            key: key.to_string(),
        })
}
