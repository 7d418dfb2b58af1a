//! Commutator Services Library
//!
//! Template rendering and the two delivery channels (SMTP email, chat bot), plus the
//! dispatcher that fans one order out to both.

pub mod chat;
pub mod dispatcher;
pub mod email;
pub mod error;
pub mod markdown;
pub mod template;

pub use chat::{ChatChannel, TelegramNotifier};
pub use dispatcher::{
    render_email, ChannelOutcome, DispatchReport, Dispatcher, DEFAULT_EMAIL_BODY,
    DEFAULT_EMAIL_SUBJECT,
};
pub use email::{EmailAttachment, EmailChannel, OutgoingEmail, SmtpEmailSender};
pub use error::{ChannelError, RenderError};
pub use markdown::{check_chat_length, escape_markdown_v2, MAX_CHAT_MESSAGE_CHARS};
pub use template::{render, resolve_template, OrderTemplateVars, TemplateVars};
