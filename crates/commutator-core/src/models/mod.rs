//! Domain models

pub mod order;
pub mod tenant;
pub mod upload;

pub use order::{
    ConsentRecord, CookieConsentRequest, NewConsentRecord, NewOrderRecord, OrderRecord,
    OrderRequest, PdfPayload,
};
pub use tenant::{
    ChatSettings, LanguageTemplates, SmtpSettings, TemplateLocator, TemplatePart, TenantProfile,
};
pub use upload::PendingUpload;
