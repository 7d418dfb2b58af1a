//! Configuration module
//!
//! Process-level settings for the HTTP service, the ephemeral file store and the
//! delivery channels. Tenant settings are not read here; see [`crate::registry`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

// Common constants
const DEFAULT_PORT: u16 = 8600;
const MAX_FILE_SIZE_MB: usize = 10;
const TEMP_FILE_TTL_SECS: u64 = 24 * 60 * 60;
const TEMP_SWEEP_INTERVAL_SECS: u64 = 60 * 60;
const RATE_LIMIT_PER_MINUTE: u32 = 10;
const RATE_LIMIT_BURST: u32 = 10;
const RATE_LIMIT_MAX_WAIT_SECS: u64 = 30;
const TRUSTED_PROXY_COUNT: usize = 1;
const SHUTDOWN_GRACE_SECS: u64 = 30;
const DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TEMP_STORAGE_DIR: &str = "app/storage/temp";
const DEFAULT_CHAT_API_BASE_URL: &str = "https://api.telegram.org";

/// Variables the process refuses to start without.
const REQUIRED_ENV: [&str; 2] = ["CSRF_KEY", "DB_PATH"];

/// Fail fast when a required variable is missing or empty.
pub fn validate_env() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    let missing: Vec<&str> = REQUIRED_ENV
        .iter()
        .copied()
        .filter(|key| env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Required environment variable(s) not set: {}",
            missing.join(", ")
        ))
    }
}

/// Settings shared by the HTTP surface
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub log_format: String,
    pub csrf_secret: String,
    pub http_rate_limit_per_minute: u32,
    pub http_rate_limit_burst: u32,
    pub http_rate_limit_max_wait_secs: u64,
    pub trusted_proxy_count: usize,
    /// Raw `ALLOWED_IPS` entries; `None` disables the allowlist.
    pub allowed_ips: Option<Vec<String>>,
    pub shutdown_grace_secs: u64,
}

/// Commutator service configuration
#[derive(Clone, Debug)]
pub struct CommutatorConfig {
    pub base: BaseConfig,
    pub db_path: String,
    pub db_max_connections: u32,
    pub temp_storage_dir: PathBuf,
    pub max_file_size_bytes: usize,
    pub temp_file_ttl_secs: u64,
    /// Interval between directory sweeps. 0 = disabled.
    pub temp_sweep_interval_secs: u64,
    pub chat_api_base_url: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<CommutatorConfig>);

impl Config {
    fn inner(&self) -> &CommutatorConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = CommutatorConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    /// Build from an arbitrary key lookup (tests, embedded use).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config(Box::new(CommutatorConfig::from_lookup(lookup)?)))
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.inner().base.log_format
    }

    pub fn csrf_secret(&self) -> &str {
        &self.inner().base.csrf_secret
    }

    pub fn http_rate_limit_per_minute(&self) -> u32 {
        self.inner().base.http_rate_limit_per_minute
    }

    pub fn http_rate_limit_burst(&self) -> u32 {
        self.inner().base.http_rate_limit_burst
    }

    pub fn http_rate_limit_max_wait(&self) -> Duration {
        Duration::from_secs(self.inner().base.http_rate_limit_max_wait_secs)
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.inner().base.trusted_proxy_count
    }

    pub fn allowed_ips(&self) -> Option<&[String]> {
        self.inner().base.allowed_ips.as_deref()
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.inner().base.shutdown_grace_secs)
    }

    pub fn db_path(&self) -> &str {
        &self.inner().db_path
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn temp_storage_dir(&self) -> &std::path::Path {
        &self.inner().temp_storage_dir
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn temp_file_ttl(&self) -> Duration {
        Duration::from_secs(self.inner().temp_file_ttl_secs)
    }

    pub fn temp_sweep_interval(&self) -> Option<Duration> {
        match self.inner().temp_sweep_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn chat_api_base_url(&self) -> &str {
        &self.inner().chat_api_base_url
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl CommutatorConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_port = match non_empty("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_PORT,
        };

        let allowed_ips = non_empty("ALLOWED_IPS").map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        let base = BaseConfig {
            server_port,
            environment: non_empty("ENVIRONMENT")
                .or_else(|| non_empty("APP_ENV"))
                .unwrap_or_else(|| "development".to_string()),
            log_format: non_empty("LOG_FORMAT")
                .map(|f| f.to_lowercase())
                .unwrap_or_else(|| "text".to_string()),
            csrf_secret: non_empty("CSRF_KEY")
                .ok_or_else(|| anyhow::anyhow!("CSRF_KEY must be set for CSRF protection"))?,
            http_rate_limit_per_minute: parse_or(
                non_empty("RATE_LIMIT_PER_MINUTE"),
                RATE_LIMIT_PER_MINUTE,
            ),
            http_rate_limit_burst: parse_or(non_empty("RATE_LIMIT_BURST"), RATE_LIMIT_BURST),
            http_rate_limit_max_wait_secs: parse_or(
                non_empty("RATE_LIMIT_MAX_WAIT_SECS"),
                RATE_LIMIT_MAX_WAIT_SECS,
            ),
            trusted_proxy_count: parse_or(non_empty("TRUSTED_PROXY_COUNT"), TRUSTED_PROXY_COUNT),
            allowed_ips,
            shutdown_grace_secs: parse_or(non_empty("SHUTDOWN_GRACE_SECS"), SHUTDOWN_GRACE_SECS),
        };

        let max_file_size_mb = parse_or(non_empty("MAX_FILE_SIZE_MB"), MAX_FILE_SIZE_MB);

        let config = CommutatorConfig {
            base,
            db_path: non_empty("DB_PATH")
                .ok_or_else(|| anyhow::anyhow!("DB_PATH must be set to the SQLite file"))?,
            db_max_connections: parse_or(non_empty("DB_MAX_CONNECTIONS"), DB_MAX_CONNECTIONS),
            temp_storage_dir: non_empty("TEMP_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMP_STORAGE_DIR)),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            temp_file_ttl_secs: parse_or(non_empty("TEMP_FILE_TTL_SECS"), TEMP_FILE_TTL_SECS),
            temp_sweep_interval_secs: parse_or(
                non_empty("TEMP_SWEEP_INTERVAL_SECS"),
                TEMP_SWEEP_INTERVAL_SECS,
            ),
            chat_api_base_url: non_empty("CHAT_API_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_CHAT_API_BASE_URL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.csrf_secret.trim().is_empty() {
            return Err(anyhow::anyhow!("CSRF_KEY cannot be empty"));
        }

        if self.db_path.trim().is_empty() {
            return Err(anyhow::anyhow!("DB_PATH cannot be empty"));
        }

        if self.base.log_format != "text" && self.base.log_format != "json" {
            return Err(anyhow::anyhow!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.base.log_format
            ));
        }

        if !self.chat_api_base_url.starts_with("http://")
            && !self.chat_api_base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "CHAT_API_BASE_URL must be an http(s) URL"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let config = Config::from_lookup(lookup_from(&[
            ("CSRF_KEY", "secret"),
            ("DB_PATH", "/tmp/comms.db"),
        ]))
        .unwrap();

        assert_eq!(config.server_port(), 8600);
        assert_eq!(config.max_file_size_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.temp_file_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.http_rate_limit_per_minute(), 10);
        assert_eq!(config.http_rate_limit_burst(), 10);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(30));
        assert_eq!(config.chat_api_base_url(), "https://api.telegram.org");
        assert_eq!(
            config.temp_storage_dir(),
            std::path::Path::new("app/storage/temp")
        );
        assert!(config.allowed_ips().is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn missing_csrf_key_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("DB_PATH", "/tmp/comms.db")])).unwrap_err();
        assert!(err.to_string().contains("CSRF_KEY"));
    }

    #[test]
    fn missing_db_path_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("CSRF_KEY", "secret")])).unwrap_err();
        assert!(err.to_string().contains("DB_PATH"));
    }

    #[test]
    fn allowed_ips_are_split_and_trimmed() {
        let config = Config::from_lookup(lookup_from(&[
            ("CSRF_KEY", "secret"),
            ("DB_PATH", "/tmp/comms.db"),
            ("ALLOWED_IPS", "10.0.0.0/8, 127.0.0.1,,"),
        ]))
        .unwrap();

        assert_eq!(
            config.allowed_ips().unwrap(),
            &["10.0.0.0/8".to_string(), "127.0.0.1".to_string()]
        );
    }

    #[test]
    fn zero_sweep_interval_disables_sweeper() {
        let config = Config::from_lookup(lookup_from(&[
            ("CSRF_KEY", "secret"),
            ("DB_PATH", "/tmp/comms.db"),
            ("TEMP_SWEEP_INTERVAL_SECS", "0"),
        ]))
        .unwrap();

        assert!(config.temp_sweep_interval().is_none());
    }

    #[test]
    fn invalid_port_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[
            ("CSRF_KEY", "secret"),
            ("DB_PATH", "/tmp/comms.db"),
            ("PORT", "eighty"),
        ]));
        assert!(result.is_err());
    }
}
