use std::{env, str::FromStr};

use anyhow::{Context, Result, bail};
use strum_macros::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum StoreBackend {
    Mysql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    /// Required for the mysql backend only.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub store_backend: StoreBackend,
    pub jwt_secret: String,
    pub access_token_ttl: i64,
    pub refresh_token_ttl: i64,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub document_dir: String,
    pub log_dir: String,
    pub log_level: String,

    /// Seed account for the memory backend.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store_backend = parse_or(&lookup, "STORE_BACKEND", StoreBackend::Mysql)?;
        let database_url = lookup("DATABASE_URL");
        if store_backend == StoreBackend::Mysql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND=mysql");
        }
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;

        Ok(Self {
            server_addr: text("SERVER_ADDR", "127.0.0.1:8080"),
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            store_backend,
            jwt_secret,
            // default 15 min
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 900)?,
            // default 7 days
            refresh_token_ttl: parse_or(&lookup, "REFRESH_TOKEN_TTL", 604_800)?,
            rate_limit_enabled: parse_or(&lookup, "RATE_LIMIT_ENABLED", true)?,
            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parse_or(&lookup, "RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,
            api_prefix: text("API_PREFIX", "/api"),
            document_dir: text("DOCUMENT_DIR", "media"),
            log_dir: text("LOG_DIR", "logs"),
            log_level: text("LOG_LEVEL", "info"),
            admin_username: lookup("ADMIN_USERNAME"),
            admin_password: lookup("ADMIN_PASSWORD"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config =
            Config::from_lookup(lookup(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s")])).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.database_url, None);
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.api_prefix, "/api");
    }

    #[test]
    fn mysql_backend_requires_a_database_url() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = Config::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s"),
            ("RATE_LOGIN_PER_MIN", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("RATE_LOGIN_PER_MIN"));
    }
}
