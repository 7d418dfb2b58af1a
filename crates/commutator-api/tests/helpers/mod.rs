//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p commutator-api`. Each test gets its own
//! SQLite file and temp directory; email and chat channels are in-process recorders.

pub mod csrf;
pub mod fixtures;

use async_trait::async_trait;
use axum_test::TestServer;
use commutator_api::constants;
use commutator_api::setup::{routes, services};
use commutator_api::state::AppState;
use commutator_core::{Config, TenantProfile, TenantRegistry};
use commutator_db::Database;
use commutator_services::{
    ChannelError, ChatChannel, Dispatcher, EmailChannel, OutgoingEmail, TemplateVars,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// One sent email, reduced to what tests assert on.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub tenant: String,
    pub subject: String,
    pub attachment_names: Vec<String>,
}

#[derive(Default)]
pub struct RecordingEmail {
    pub sent: Mutex<Vec<SentEmail>>,
}

#[async_trait]
impl EmailChannel for RecordingEmail {
    async fn send_email(
        &self,
        profile: &TenantProfile,
        email: &OutgoingEmail,
    ) -> Result<(), ChannelError> {
        if !profile.smtp.is_configured() {
            return Err(ChannelError::NotConfigured("SMTP settings missing"));
        }
        self.sent.lock().unwrap().push(SentEmail {
            tenant: profile.name.clone(),
            subject: email.subject.clone(),
            attachment_names: email
                .attachments
                .iter()
                .map(|a| a.file_name.clone())
                .collect(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingChat {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatChannel for RecordingChat {
    async fn send_chat_message(
        &self,
        profile: &TenantProfile,
        language: &str,
        _vars: &dyn TemplateVars,
    ) -> Result<(), ChannelError> {
        if !profile.chat.is_configured() {
            return Err(ChannelError::NotConfigured("bot token or chat id missing"));
        }
        self.messages
            .lock()
            .unwrap()
            .push(format!("{}:{}", profile.name, language));
        Ok(())
    }

    async fn send_chat_document(
        &self,
        _bot_token: &str,
        _chat_id: &str,
        _file_path: &Path,
        _caption: &str,
    ) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub email: Arc<RecordingEmail>,
    pub chat: Arc<RecordingChat>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Files currently held by the ephemeral store.
    pub fn files_on_disk(&self) -> usize {
        std::fs::read_dir(self.state.delivery.uploads.dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub async fn order_count(&self) -> i64 {
        self.state.db.orders.count().await.unwrap()
    }

    pub async fn consent_count(&self) -> i64 {
        self.state.db.consents.count().await.unwrap()
    }
}

/// Tenants every test app knows about.
///
/// `Acme` has SMTP only; `Globex` has SMTP and chat.
fn tenant_vars() -> Vec<(&'static str, &'static str)> {
    vec![
        ("ACME_SERVICE_NAME", "Acme"),
        ("ACME_LANGS", "en,ru"),
        ("ACME_SMTP_HOST", "smtp.acme.test"),
        ("ACME_SMTP_PORT", "587"),
        ("ACME_FROM_EMAIL", "orders@acme.test"),
        ("GLOBEX_SERVICE_NAME", "Globex"),
        ("GLOBEX_LANGS", "en,es"),
        ("GLOBEX_SMTP_HOST", "smtp.globex.test"),
        ("GLOBEX_SMTP_PORT", "465"),
        ("GLOBEX_FROM_EMAIL", "orders@globex.test"),
        ("GLOBEX_TG_BOT_TOKEN", "123:abc"),
        ("GLOBEX_TG_CHAT_ID", "-1001"),
    ]
}

/// Setup a test app with default settings.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

/// Setup a test app, overriding configuration keys.
pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("commutator.db");
    let uploads_dir = temp_dir.path().join("uploads");

    let mut vars: HashMap<String, String> = HashMap::from([
        ("CSRF_KEY".to_string(), "test-csrf-secret-0123456789abcdef".to_string()),
        ("DB_PATH".to_string(), db_path.display().to_string()),
        ("TEMP_STORAGE_DIR".to_string(), uploads_dir.display().to_string()),
        ("MAX_FILE_SIZE_MB".to_string(), "1".to_string()),
        ("TEMP_SWEEP_INTERVAL_SECS".to_string(), "0".to_string()),
        ("RATE_LIMIT_PER_MINUTE".to_string(), "600".to_string()),
        ("RATE_LIMIT_BURST".to_string(), "100".to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("test config");

    let database = Database::open(&db_path, 2).await.expect("open database");
    database.migrate().await.expect("migrate");

    let registry = TenantRegistry::from_vars(tenant_vars());
    let email = Arc::new(RecordingEmail::default());
    let chat = Arc::new(RecordingChat::default());
    let dispatcher = Dispatcher::new(email.clone(), chat.clone());

    let state = services::build_state(&config, database, registry, dispatcher)
        .await
        .expect("build state");
    let app = routes::setup_routes(&config, state.clone()).expect("routes");

    let server = TestServer::new(app.into_make_service()).expect("test server");

    TestApp {
        server,
        state,
        email,
        chat,
        _temp_dir: temp_dir,
    }
}
