//! Tenant registry
//!
//! Every tenant service is described by a family of environment variables sharing a
//! prefix, e.g. `ACME_SERVICE_NAME`, `ACME_SMTP_HOST`, `ACME_EMAIL_BODY_EN_PATH`.
//! The registry scans the variables once, builds an immutable [`TenantProfile`] per
//! prefix and answers case-insensitive lookups without locking.
//!
//! Missing companion keys never abort the build: the tenant is registered in a degraded
//! state, a warning is logged, and the affected channel fails later with a channel error.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::{
    ChatSettings, LanguageTemplates, SmtpSettings, TemplateLocator, TenantProfile,
};

const SERVICE_NAME_SUFFIX: &str = "_SERVICE_NAME";
const FALLBACK_LANGUAGE: &str = "en";
const DEFAULT_LANGUAGES: [&str; 3] = ["en", "ru", "es"];

/// Immutable lookup table of configured tenants
#[derive(Debug, Clone, Default)]
pub struct TenantRegistry {
    tenants: HashMap<String, Arc<TenantProfile>>,
}

impl TenantRegistry {
    /// Build from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from any set of key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        // Sorted so that duplicate service names resolve deterministically.
        let prefixes: BTreeMap<&str, &str> = vars
            .iter()
            .filter_map(|(key, value)| {
                key.strip_suffix(SERVICE_NAME_SUFFIX)
                    .filter(|prefix| !prefix.is_empty())
                    .map(|prefix| (prefix, value.as_str()))
            })
            .collect();

        let mut tenants = HashMap::new();
        for (prefix, name) in prefixes {
            let name = name.trim();
            if name.is_empty() {
                tracing::warn!(prefix = %prefix, "Skipping tenant with empty service name");
                continue;
            }

            let profile = build_profile(prefix, name, &vars);
            let missing = profile.missing_pieces();
            if !missing.is_empty() {
                tracing::warn!(
                    service = %profile.name,
                    prefix = %prefix,
                    missing = %missing.join(", "),
                    "Tenant registered with incomplete configuration"
                );
            }

            if tenants.contains_key(&profile.id) {
                tracing::warn!(
                    service = %profile.name,
                    prefix = %prefix,
                    "Duplicate service name, keeping the first definition"
                );
                continue;
            }

            tracing::info!(
                service = %profile.name,
                languages = %profile.languages.join(","),
                email = profile.smtp.is_configured(),
                chat = profile.chat.is_configured(),
                "Tenant registered"
            );
            tenants.insert(profile.id.clone(), Arc::new(profile));
        }

        Self { tenants }
    }

    /// Case-insensitive exact match on the service name.
    pub fn resolve(&self, identifier: &str) -> Option<Arc<TenantProfile>> {
        self.tenants
            .get(&identifier.trim().to_lowercase())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tenants.values().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn build_profile(prefix: &str, name: &str, vars: &HashMap<String, String>) -> TenantProfile {
    let get = |suffix: &str| -> String {
        vars.get(&format!("{}_{}", prefix, suffix))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };
    let get_opt = |suffix: &str| -> Option<String> {
        let value = get(suffix);
        (!value.is_empty()).then_some(value)
    };

    let languages = parse_languages(&get("LANGS"));

    let port = get_opt("SMTP_PORT").and_then(|raw| match raw.parse::<u16>() {
        Ok(port) => Some(port),
        Err(_) => {
            tracing::warn!(prefix = %prefix, value = %raw, "Ignoring unparsable SMTP port");
            None
        }
    });

    let smtp = SmtpSettings {
        host: get("SMTP_HOST"),
        port,
        user: get("SMTP_USER"),
        password: get("SMTP_PASS"),
        from: get("FROM_EMAIL"),
        admin: get_opt("ADMIN_EMAIL"),
    };

    let chat = ChatSettings {
        bot_token: get("TG_BOT_TOKEN"),
        chat_id: get("TG_CHAT_ID"),
    };

    let locator = |part: &str, lang: &str| -> TemplateLocator {
        let key = format!("{}_{}", part, lang.to_uppercase());
        TemplateLocator {
            path: get_opt(&format!("{}_PATH", key)).map(PathBuf::from),
            inline: vars
                .get(&format!("{}_{}", prefix, key))
                .filter(|v| !v.trim().is_empty())
                .cloned(),
        }
    };

    let templates = languages
        .iter()
        .map(|lang| {
            (
                lang.clone(),
                LanguageTemplates {
                    email_subject: locator("EMAIL_SUBJECT", lang),
                    email_body: locator("EMAIL_BODY", lang),
                    chat_body: locator("TG_MSG", lang),
                },
            )
        })
        .collect();

    TenantProfile {
        id: name.to_lowercase(),
        name: name.to_string(),
        languages,
        smtp,
        chat,
        templates,
    }
}

fn parse_languages(raw: &str) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for lang in raw.split(',').map(|l| l.trim().to_lowercase()) {
        if !lang.is_empty() && !languages.contains(&lang) {
            languages.push(lang);
        }
    }

    if languages.is_empty() {
        DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect()
    } else {
        languages
    }
}

/// Reduce an `Accept-Language` value to its first primary tag: `"ru-RU,ru;q=0.9"` -> `"ru"`.
fn primary_tag(locale_hint: &str) -> Option<String> {
    let first = locale_hint.split(',').next()?;
    let tag = first.split(';').next()?.trim();
    let primary = tag.split(['-', '_']).next()?.trim().to_lowercase();
    (!primary.is_empty()).then_some(primary)
}

/// Pick the language a request is answered in.
///
/// The requested code wins, then the locale hint, then `"en"`. A candidate the tenant
/// does not support is replaced by the tenant's first language (or `"en"` if it has none).
pub fn negotiate_language(
    profile: &TenantProfile,
    requested: Option<&str>,
    locale_hint: Option<&str>,
) -> String {
    let candidate = requested
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty())
        .or_else(|| locale_hint.and_then(primary_tag))
        .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string());

    if profile.supports(&candidate) {
        candidate
    } else {
        profile
            .default_language()
            .unwrap_or(FALLBACK_LANGUAGE)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplatePart;

    fn acme_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ACME_SERVICE_NAME", "Acme"),
            ("ACME_LANGS", "en, RU"),
            ("ACME_SMTP_HOST", "smtp.acme.test"),
            ("ACME_SMTP_PORT", "587"),
            ("ACME_SMTP_USER", "mailer"),
            ("ACME_SMTP_PASS", "hunter2"),
            ("ACME_FROM_EMAIL", "orders@acme.test"),
            ("ACME_ADMIN_EMAIL", "ops@acme.test"),
            ("ACME_TG_BOT_TOKEN", "123:abc"),
            ("ACME_TG_CHAT_ID", "-100"),
            ("ACME_EMAIL_SUBJECT_EN", "Order for {service_name}"),
            ("ACME_EMAIL_BODY_RU_PATH", "/etc/acme/body_ru.txt"),
            ("ACME_TG_MSG_EN_PATH", "/etc/acme/tg_en.md"),
            ("UNRELATED", "value"),
        ]
    }

    #[test]
    fn builds_one_profile_per_prefix() {
        let registry = TenantRegistry::from_vars(acme_vars());
        assert_eq!(registry.len(), 1);

        let acme = registry.resolve("acme").unwrap();
        assert_eq!(acme.name, "Acme");
        assert_eq!(acme.languages, vec!["en", "ru"]);
        assert_eq!(acme.smtp.port, Some(587));
        assert_eq!(acme.smtp.admin.as_deref(), Some("ops@acme.test"));
        assert!(acme.smtp.is_configured());
        assert!(acme.chat.is_configured());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = TenantRegistry::from_vars(acme_vars());
        assert!(registry.resolve("ACME").is_some());
        assert!(registry.resolve("AcMe").is_some());
        assert!(registry.resolve("other").is_none());
    }

    #[test]
    fn template_locators_follow_language_keys() {
        let registry = TenantRegistry::from_vars(acme_vars());
        let acme = registry.resolve("acme").unwrap();

        let subject = acme.locator(TemplatePart::EmailSubject, "en").unwrap();
        assert_eq!(subject.inline.as_deref(), Some("Order for {service_name}"));
        assert!(subject.path.is_none());

        let body_ru = acme.locator(TemplatePart::EmailBody, "ru").unwrap();
        assert_eq!(
            body_ru.path.as_deref(),
            Some(std::path::Path::new("/etc/acme/body_ru.txt"))
        );

        assert!(acme.locator(TemplatePart::EmailBody, "en").is_none());
        assert!(acme.locator(TemplatePart::ChatBody, "ru").is_none());
    }

    #[test]
    fn missing_companion_keys_register_degraded_tenant() {
        let registry = TenantRegistry::from_vars(vec![("BARE_SERVICE_NAME", "Bare")]);
        let bare = registry.resolve("bare").unwrap();

        assert_eq!(bare.languages, vec!["en", "ru", "es"]);
        assert!(!bare.smtp.is_configured());
        assert!(!bare.chat.is_configured());
        assert!(bare.missing_pieces().contains(&"chat channel"));
    }

    #[test]
    fn unparsable_port_is_left_unset() {
        let registry = TenantRegistry::from_vars(vec![
            ("X_SERVICE_NAME", "X"),
            ("X_SMTP_PORT", "smtp"),
        ]);
        assert_eq!(registry.resolve("x").unwrap().smtp.port, None);
    }

    #[test]
    fn empty_service_name_is_skipped() {
        let registry = TenantRegistry::from_vars(vec![("EMPTY_SERVICE_NAME", "  ")]);
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_names_keep_first_prefix() {
        let registry = TenantRegistry::from_vars(vec![
            ("B_SERVICE_NAME", "shop"),
            ("B_TG_CHAT_ID", "second"),
            ("A_SERVICE_NAME", "Shop"),
            ("A_TG_CHAT_ID", "first"),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("shop").unwrap().chat.chat_id, "first");
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let registry = TenantRegistry::from_vars(acme_vars());
        let debug = format!("{:?}", registry.resolve("acme").unwrap());
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("123:abc"));
    }

    fn profile_with(languages: &[&str]) -> TenantProfile {
        TenantProfile {
            id: "t".into(),
            name: "T".into(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
            smtp: SmtpSettings::default(),
            chat: ChatSettings::default(),
            templates: HashMap::new(),
        }
    }

    #[test]
    fn negotiation_defaults_to_english() {
        let profile = profile_with(&["en", "ru"]);
        assert_eq!(negotiate_language(&profile, Some(""), None), "en");
        assert_eq!(negotiate_language(&profile, None, None), "en");
    }

    #[test]
    fn unsupported_language_falls_back_to_first_supported() {
        let profile = profile_with(&["en", "ru"]);
        assert_eq!(negotiate_language(&profile, Some("fr"), None), "en");

        let profile = profile_with(&["es", "ru"]);
        assert_eq!(negotiate_language(&profile, Some("fr"), None), "es");
        assert_eq!(negotiate_language(&profile, None, None), "es");
    }

    #[test]
    fn requested_language_beats_locale_hint() {
        let profile = profile_with(&["en", "ru", "es"]);
        assert_eq!(
            negotiate_language(&profile, Some("ES"), Some("ru-RU,ru;q=0.9")),
            "es"
        );
        assert_eq!(
            negotiate_language(&profile, None, Some("ru-RU,ru;q=0.9")),
            "ru"
        );
    }

    #[test]
    fn profile_without_languages_negotiates_english() {
        let profile = profile_with(&[]);
        assert_eq!(negotiate_language(&profile, Some("de"), None), "en");
    }
}
