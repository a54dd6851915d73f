use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Browser-like user agent sent with outbound product page fetches.
///
/// Many storefronts serve a bot wall or an empty shell to non-browser agents,
/// so the default mimics desktop Chrome.
pub const DEFAULT_FETCH_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

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

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("WISHLIST_ENV", "development"))?;

    let bind_addr = or_default("WISHLIST_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("WISHLIST_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("WISHLIST_LOG_LEVEL", "info");

    let enrich_secret = lookup("WISHLIST_ENRICH_SECRET")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if enrich_secret.is_none() && env != Environment::Development {
        return Err(ConfigError::MissingEnvVar(
            "WISHLIST_ENRICH_SECRET".to_string(),
        ));
    }

    let db_max_connections = parse_u32("WISHLIST_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("WISHLIST_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("WISHLIST_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_timeout_secs = parse_u64("WISHLIST_FETCH_TIMEOUT_SECS", "20")?;
    if fetch_timeout_secs == 0 {
        return Err(invalid(
            "WISHLIST_FETCH_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let fetch_user_agent = or_default("WISHLIST_FETCH_USER_AGENT", DEFAULT_FETCH_USER_AGENT);

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        enrich_secret,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_secs,
        fetch_user_agent,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "WISHLIST_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
