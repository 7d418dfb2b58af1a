//! SMTP delivery of order confirmations.

use crate::error::ChannelError;
use async_trait::async_trait;
use commutator_core::TenantProfile;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as LettreAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

const DEFAULT_SMTP_PORT: u16 = 587;
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<EmailAttachment>,
}

#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send_email(
        &self,
        profile: &TenantProfile,
        email: &OutgoingEmail,
    ) -> Result<(), ChannelError>;
}

fn parse_mailbox(address: &str) -> Result<Mailbox, ChannelError> {
    address
        .trim()
        .parse()
        .map_err(|e: lettre::address::AddressError| ChannelError::InvalidRecipient {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Build the multipart/mixed message: one text part, then one part per attachment.
///
/// The recipient is checked before any tenant configuration so that a malformed
/// address is reported as such even for unconfigured tenants.
pub fn build_message(
    profile: &TenantProfile,
    email: &OutgoingEmail,
) -> Result<Message, ChannelError> {
    let to = parse_mailbox(&email.recipient)?;

    if !profile.smtp.is_configured() {
        return Err(ChannelError::NotConfigured("smtp host or from address missing"));
    }
    let from: Mailbox = profile.smtp.from.parse().map_err(|e| {
        ChannelError::Transport(format!("invalid from address '{}': {}", profile.smtp.from, e))
    })?;

    let mut builder = Message::builder().from(from).to(to).subject(email.subject.as_str());

    // Admin copy is an envelope recipient only; the Bcc header is not written.
    if let Some(admin) = profile.smtp.admin.as_deref().filter(|a| !a.trim().is_empty()) {
        match admin.trim().parse::<Mailbox>() {
            Ok(bcc) => builder = builder.bcc(bcc),
            Err(e) => tracing::warn!(
                tenant = %profile.id,
                error = %e,
                "Ignoring unparsable admin address"
            ),
        }
    }

    let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));
    for attachment in &email.attachments {
        let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
            ChannelError::Transport(format!(
                "invalid content type '{}': {}",
                attachment.content_type, e
            ))
        })?;
        multipart = multipart.singlepart(
            LettreAttachment::new(attachment.file_name.clone())
                .body(attachment.data.clone(), content_type),
        );
    }

    builder
        .multipart(multipart)
        .map_err(|e| ChannelError::Transport(e.to_string()))
}

fn build_transport(
    profile: &TenantProfile,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, ChannelError> {
    let smtp = &profile.smtp;
    let port = smtp.port.unwrap_or(DEFAULT_SMTP_PORT);

    let builder = if port == IMPLICIT_TLS_PORT {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
    }
    .map_err(|e| ChannelError::Transport(e.to_string()))?
    .port(port);

    let builder = if smtp.user.is_empty() {
        builder
    } else {
        builder.credentials(Credentials::new(smtp.user.clone(), smtp.password.clone()))
    };

    Ok(builder.build())
}

/// Sends through each tenant's own SMTP relay.
#[derive(Debug, Clone, Default)]
pub struct SmtpEmailSender;

impl SmtpEmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailChannel for SmtpEmailSender {
    #[tracing::instrument(skip(self, profile, email), fields(tenant = %profile.id, attachments = email.attachments.len()))]
    async fn send_email(
        &self,
        profile: &TenantProfile,
        email: &OutgoingEmail,
    ) -> Result<(), ChannelError> {
        let message = build_message(profile, email)?;
        let transport = build_transport(profile)?;

        transport
            .send(message)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        tracing::info!(
            host = %profile.smtp.host,
            port = profile.smtp.port.unwrap_or(DEFAULT_SMTP_PORT),
            "Order email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commutator_core::models::SmtpSettings;
    use std::collections::HashMap;

    fn profile(smtp: SmtpSettings) -> TenantProfile {
        TenantProfile {
            id: "alpha".to_string(),
            name: "Alpha".to_string(),
            languages: vec!["en".to_string()],
            smtp,
            chat: Default::default(),
            templates: HashMap::new(),
        }
    }

    fn configured() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.alpha.test".to_string(),
            port: Some(587),
            user: "mailer".to_string(),
            password: "secret".to_string(),
            from: "orders@alpha.test".to_string(),
            admin: Some("ops@alpha.test".to_string()),
        }
    }

    fn email(recipient: &str) -> OutgoingEmail {
        OutgoingEmail {
            recipient: recipient.to_string(),
            subject: "Order Confirmation".to_string(),
            body: "Thanks for your order".to_string(),
            attachments: vec![EmailAttachment {
                file_name: "invoice.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                data: b"%PDF-1.4 invoice".to_vec(),
            }],
        }
    }

    #[test]
    fn invalid_recipient_is_reported_before_configuration() {
        let err = build_message(&profile(SmtpSettings::default()), &email("not an address"))
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidRecipient { .. }));
    }

    #[test]
    fn unconfigured_smtp_is_not_configured() {
        let err = build_message(&profile(SmtpSettings::default()), &email("ann@example.com"))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn message_has_headers_attachment_and_hidden_bcc() {
        let message = build_message(&profile(configured()), &email("ann@example.com")).unwrap();

        let recipients: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert!(recipients.contains(&"ann@example.com".to_string()));
        assert!(recipients.contains(&"ops@alpha.test".to_string()));

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: orders@alpha.test"));
        assert!(raw.contains("To: ann@example.com"));
        assert!(raw.contains("Subject: Order Confirmation"));
        assert!(raw.contains("MIME-Version: 1.0"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("Content-Type: application/pdf"));
        assert!(raw.contains("filename=\"invoice.pdf\""));
        assert!(!raw.contains("Bcc:"));
    }

    #[test]
    fn bad_admin_address_is_skipped() {
        let mut smtp = configured();
        smtp.admin = Some("ops at alpha".to_string());

        let message = build_message(&profile(smtp), &email("ann@example.com")).unwrap();
        assert_eq!(message.envelope().to().len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_tenant_does_no_io() {
        let err = SmtpEmailSender::new()
            .send_email(&profile(SmtpSettings::default()), &email("ann@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
    }
}
