use crate::app_config::{AppConfig, Environment};
use crate::sync::IncompletePolicy;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_i32 = |var: &str, default: &str| -> Result<i32, ConfigError> {
        or_default(var, default)
            .parse::<i32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    // Pool-like settings must be at least 1; zero would deadlock the run.
    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("VITRINE_ENV", "development"))?;

    let bind_addr = parse_addr("VITRINE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("VITRINE_LOG_LEVEL", "info");
    let vendors_path = PathBuf::from(or_default("VITRINE_VENDORS_PATH", "./config/vendors.yaml"));

    let db_max_connections = parse_u32("VITRINE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("VITRINE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("VITRINE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_request_timeout_secs = parse_u64("VITRINE_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default(
        "VITRINE_SCRAPER_USER_AGENT",
        "vitrine/0.1 (catalog-sync)",
    );
    let scraper_max_retries = parse_u32("VITRINE_SCRAPER_MAX_RETRIES", "2")?;
    let scraper_retry_backoff_base_secs =
        parse_u64("VITRINE_SCRAPER_RETRY_BACKOFF_BASE_SECS", "2")?;

    let enrichment_timeout_secs = parse_u64("VITRINE_ENRICHMENT_TIMEOUT_SECS", "15")?;
    if enrichment_timeout_secs > scraper_request_timeout_secs {
        return Err(invalid(
            "VITRINE_ENRICHMENT_TIMEOUT_SECS",
            format!(
                "must not exceed VITRINE_SCRAPER_REQUEST_TIMEOUT_SECS ({scraper_request_timeout_secs})"
            ),
        ));
    }
    let max_enrichment = or_default("VITRINE_MAX_ENRICHMENT", "5")
        .parse::<usize>()
        .map_err(|e| invalid("VITRINE_MAX_ENRICHMENT", e.to_string()))?;
    let max_dom_candidates = parse_positive_usize("VITRINE_MAX_DOM_CANDIDATES", "20")?;
    let single_page_threshold = parse_i32("VITRINE_SINGLE_PAGE_THRESHOLD", "5")?;

    let max_concurrent_vendors = parse_positive_usize("VITRINE_MAX_CONCURRENT_VENDORS", "2")?;
    let sync_concurrency = parse_positive_usize("VITRINE_SYNC_CONCURRENCY", "4")?;
    let incomplete_policy = or_default("VITRINE_INCOMPLETE_POLICY", "warn")
        .parse::<IncompletePolicy>()
        .map_err(|e| invalid("VITRINE_INCOMPLETE_POLICY", e))?;
    let sync_stale_after_mins = parse_u64("VITRINE_SYNC_STALE_AFTER_MINS", "120")?;
    if sync_stale_after_mins == 0 {
        return Err(invalid(
            "VITRINE_SYNC_STALE_AFTER_MINS",
            "must be at least 1".to_string(),
        ));
    }
    let sync_cron = lookup("VITRINE_SYNC_CRON")
        .ok()
        .filter(|s| !s.trim().is_empty());

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        vendors_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        enrichment_timeout_secs,
        max_enrichment,
        max_dom_candidates,
        single_page_threshold,
        max_concurrent_vendors,
        sync_concurrency,
        incomplete_policy,
        sync_stale_after_mins,
        sync_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VITRINE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
