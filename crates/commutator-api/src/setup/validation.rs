//! Configuration validation
//!
//! Catches misconfiguration at startup instead of on the first request.

use anyhow::Result;
use commutator_core::Config;
use commutator_infra::IpAllowlist;

const MIN_CSRF_SECRET_LEN: usize = 32;

/// Validate critical configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if config.http_rate_limit_per_minute() == 0 {
        return Err(anyhow::anyhow!("HTTP rate limit cannot be 0"));
    }

    if config.http_rate_limit_burst() == 0 {
        return Err(anyhow::anyhow!("HTTP rate limit burst cannot be 0"));
    }

    if config.db_max_connections() == 0 {
        return Err(anyhow::anyhow!("Database max connections cannot be 0"));
    }

    if config.max_file_size_bytes() == 0 {
        return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB cannot be 0"));
    }

    if config.temp_file_ttl().is_zero() {
        return Err(anyhow::anyhow!("TEMP_FILE_TTL_SECS cannot be 0"));
    }

    if config.csrf_secret().len() < MIN_CSRF_SECRET_LEN {
        if config.is_production() {
            return Err(anyhow::anyhow!(
                "CSRF_KEY must be at least {} characters in production",
                MIN_CSRF_SECRET_LEN
            ));
        }
        tracing::warn!(
            min_len = MIN_CSRF_SECRET_LEN,
            "CSRF_KEY is short; use a longer random secret"
        );
    }

    if let Some(entries) = config.allowed_ips() {
        let allowlist = IpAllowlist::parse(entries, config.trusted_proxy_count())
            .map_err(|e| anyhow::anyhow!("Invalid ALLOWED_IPS: {}", e))?;
        if allowlist.allows_everyone() && config.is_production() {
            tracing::warn!("ALLOWED_IPS contains '*' in production; the allowlist admits everyone");
        }
    }

    if config.trusted_proxy_count() > 10 {
        tracing::warn!(
            trusted_proxy_count = config.trusted_proxy_count(),
            "TRUSTED_PROXY_COUNT is very high - ensure this matches your actual proxy setup"
        );
    }

    if config.temp_sweep_interval().is_none() {
        tracing::warn!("Temp directory sweep disabled; orphaned files rely on deferred deletion only");
    }

    Ok(())
}
