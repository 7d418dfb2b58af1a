//! `{key}` placeholder rendering.
//!
//! Templates are plain text with `{key}` tokens. Known keys are substituted in a single
//! left-to-right pass; substituted values are never re-scanned and unknown tokens are
//! left exactly as written.

use crate::error::RenderError;
use commutator_core::models::TemplatePart;
use commutator_core::{OrderRequest, TenantProfile};
use std::borrow::Cow;

/// Source of values for placeholder substitution.
pub trait TemplateVars: Send + Sync {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>>;
}

/// Variables available to order templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderTemplateVars {
    pub full_name: String,
    pub company: String,
    pub contact: String,
    pub project_link: String,
    pub payment: String,
    pub start_date: String,
    pub language: String,
    pub service_name: String,
}

impl OrderTemplateVars {
    pub const KEYS: [&'static str; 8] = [
        "full_name",
        "company",
        "contact",
        "project_link",
        "payment",
        "start_date",
        "language",
        "service_name",
    ];

    pub fn from_order(order: &OrderRequest, service_name: &str, language: &str) -> Self {
        Self {
            full_name: order.full_name.clone(),
            company: order.company_name.clone(),
            contact: order.contact_info.clone(),
            project_link: order.project_link.clone(),
            payment: order.payment_method.clone(),
            start_date: order.start_date.clone(),
            language: language.to_string(),
            service_name: service_name.to_string(),
        }
    }
}

impl TemplateVars for OrderTemplateVars {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        let value = match key {
            "full_name" => &self.full_name,
            "company" => &self.company,
            "contact" => &self.contact,
            "project_link" => &self.project_link,
            "payment" => &self.payment,
            "start_date" => &self.start_date,
            "language" => &self.language,
            "service_name" => &self.service_name,
            _ => return None,
        };
        Some(Cow::Borrowed(value.as_str()))
    }
}

impl TemplateVars for [(&str, &str)] {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        self.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| Cow::Borrowed(*v))
    }
}

impl<const N: usize> TemplateVars for [(&str, &str); N] {
    fn lookup(&self, key: &str) -> Option<Cow<'_, str>> {
        self.as_slice().lookup(key)
    }
}

fn is_key(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Substitute every known `{key}` in `template`.
pub fn render<V: TemplateVars + ?Sized>(template: &str, vars: &V) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substituted = after.find('}').and_then(|close| {
            let key = &after[..close];
            if !is_key(key) {
                return None;
            }
            vars.lookup(key).map(|value| (value, close))
        });

        match substituted {
            Some((value, close)) => {
                out.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Load the template text for `part` in `language`.
///
/// A configured file path is read on every call and takes precedence over inline text.
pub async fn resolve_template(
    profile: &TenantProfile,
    part: TemplatePart,
    language: &str,
) -> Result<String, RenderError> {
    let locator = profile
        .locator(part, language)
        .ok_or_else(|| RenderError::MissingTemplate {
            part,
            language: language.to_string(),
        })?;

    if let Some(path) = &locator.path {
        return tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RenderError::Io {
                path: path.clone(),
                source,
            });
    }

    locator
        .inline
        .clone()
        .ok_or_else(|| RenderError::MissingTemplate {
            part,
            language: language.to_string(),
        })
}
