//! Fan-out of one order to every delivery channel.
//!
//! Both channels are always attempted, concurrently, and neither outcome affects the
//! other. Failures end up in the [`DispatchReport`]; nothing here is retried.

use crate::chat::ChatChannel;
use crate::email::{EmailChannel, OutgoingEmail};
use crate::error::{ChannelError, RenderError};
use crate::template::{render, resolve_template, TemplateVars};
use commutator_core::models::TemplatePart;
use commutator_core::TenantProfile;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_EMAIL_SUBJECT: &str = "Order Confirmation";
pub const DEFAULT_EMAIL_BODY: &str =
    "Thank you, your order has been received. The documents are attached.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Delivered,
    Skipped(String),
    Failed(String),
}

impl ChannelOutcome {
    fn from_result(result: Result<(), ChannelError>) -> Self {
        match result {
            Ok(()) => ChannelOutcome::Delivered,
            Err(e) if e.is_configuration() => ChannelOutcome::Skipped(e.to_string()),
            Err(e) => ChannelOutcome::Failed(e.to_string()),
        }
    }
}

impl fmt::Display for ChannelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelOutcome::Delivered => f.write_str("delivered"),
            ChannelOutcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            ChannelOutcome::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub email: ChannelOutcome,
    pub chat: ChannelOutcome,
}

/// Render the confirmation subject and body, substituting the fixed defaults for any
/// part the tenant has no template for.
pub async fn render_email(
    profile: &TenantProfile,
    language: &str,
    vars: &dyn TemplateVars,
) -> (String, String) {
    let subject = part_or_default(
        profile,
        TemplatePart::EmailSubject,
        language,
        DEFAULT_EMAIL_SUBJECT,
    )
    .await;
    let body =
        part_or_default(profile, TemplatePart::EmailBody, language, DEFAULT_EMAIL_BODY).await;
    (render(&subject, vars), render(&body, vars))
}

async fn part_or_default(
    profile: &TenantProfile,
    part: TemplatePart,
    language: &str,
    default: &str,
) -> String {
    match resolve_template(profile, part, language).await {
        Ok(text) => text,
        Err(e @ RenderError::MissingTemplate { .. }) => {
            tracing::debug!(tenant = %profile.id, error = %e, "Using default email text");
            default.to_string()
        }
        Err(e) => {
            tracing::warn!(tenant = %profile.id, error = %e, "Email template unreadable, using default");
            default.to_string()
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    email: Arc<dyn EmailChannel>,
    chat: Arc<dyn ChatChannel>,
}

impl Dispatcher {
    pub fn new(email: Arc<dyn EmailChannel>, chat: Arc<dyn ChatChannel>) -> Self {
        Self { email, chat }
    }

    /// Send `email` (if any) and the chat notification. `email` is `None` when there is
    /// nothing to attach, which skips the email channel.
    #[tracing::instrument(skip_all, fields(tenant = %profile.id, language = %language))]
    pub async fn dispatch(
        &self,
        profile: &TenantProfile,
        language: &str,
        email: Option<&OutgoingEmail>,
        vars: &dyn TemplateVars,
    ) -> DispatchReport {
        let email_send = async {
            match email {
                Some(email) => {
                    ChannelOutcome::from_result(self.email.send_email(profile, email).await)
                }
                None => ChannelOutcome::Skipped("no attachments".to_string()),
            }
        };
        let chat_send = async {
            ChannelOutcome::from_result(self.chat.send_chat_message(profile, language, vars).await)
        };

        let (email, chat) = tokio::join!(email_send, chat_send);
        let report = DispatchReport { email, chat };

        for (channel, outcome) in [("email", &report.email), ("chat", &report.chat)] {
            match outcome {
                ChannelOutcome::Delivered => tracing::info!(channel, "Delivered"),
                ChannelOutcome::Skipped(reason) => {
                    tracing::info!(channel, reason = %reason, "Channel skipped")
                }
                ChannelOutcome::Failed(reason) => {
                    tracing::error!(channel, reason = %reason, "Delivery failed")
                }
            }
        }

        report
    }
}
