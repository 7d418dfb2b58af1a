use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// SMTP delivery settings for one tenant
#[derive(Clone, Default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub from: String,
    /// Operator copy, delivered as Bcc.
    pub admin: Option<String>,
}

impl SmtpSettings {
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.from.is_empty()
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("admin", &self.admin)
            .finish()
    }
}

/// Chat-bot delivery settings for one tenant
#[derive(Clone, Default)]
pub struct ChatSettings {
    pub bot_token: String,
    pub chat_id: String,
}

impl ChatSettings {
    /// Configured iff both token and destination are present.
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

impl fmt::Debug for ChatSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSettings")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Which rendered message a template produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplatePart {
    EmailSubject,
    EmailBody,
    ChatBody,
}

impl TemplatePart {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplatePart::EmailSubject => "email_subject",
            TemplatePart::EmailBody => "email_body",
            TemplatePart::ChatBody => "chat_body",
        }
    }
}

/// Where a template's text comes from. A file path wins over inline text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateLocator {
    pub path: Option<PathBuf>,
    pub inline: Option<String>,
}

impl TemplateLocator {
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.inline.is_none()
    }
}

/// Templates configured for a single language
#[derive(Debug, Clone, Default)]
pub struct LanguageTemplates {
    pub email_subject: TemplateLocator,
    pub email_body: TemplateLocator,
    pub chat_body: TemplateLocator,
}

impl LanguageTemplates {
    pub fn get(&self, part: TemplatePart) -> &TemplateLocator {
        match part {
            TemplatePart::EmailSubject => &self.email_subject,
            TemplatePart::EmailBody => &self.email_body,
            TemplatePart::ChatBody => &self.chat_body,
        }
    }
}

/// Delivery configuration for one tenant service
#[derive(Debug, Clone)]
pub struct TenantProfile {
    /// Lower-cased lookup key
    pub id: String,
    /// Name exactly as configured
    pub name: String,
    /// Ordered, non-empty, lower-cased
    pub languages: Vec<String>,
    pub smtp: SmtpSettings,
    pub chat: ChatSettings,
    pub templates: HashMap<String, LanguageTemplates>,
}

impl TenantProfile {
    pub fn supports(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }

    pub fn default_language(&self) -> Option<&str> {
        self.languages.first().map(String::as_str)
    }

    /// Locator for `part` in `language`, if anything is configured for it.
    pub fn locator(&self, part: TemplatePart, language: &str) -> Option<&TemplateLocator> {
        self.templates
            .get(language)
            .map(|t| t.get(part))
            .filter(|locator| !locator.is_empty())
    }

    /// Human-readable list of what this tenant cannot do yet.
    pub fn missing_pieces(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.smtp.host.is_empty() {
            missing.push("smtp host");
        }
        if self.smtp.port.is_none() {
            missing.push("smtp port");
        }
        if self.smtp.from.is_empty() {
            missing.push("from address");
        }
        if !self.chat.is_configured() {
            missing.push("chat channel");
        }
        if self.templates.values().all(|t| t.chat_body.is_empty()) {
            missing.push("chat templates");
        }
        missing
    }
}
