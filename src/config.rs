use std::env;
use std::str::FromStr;

use anyhow::{Context, bail};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum StorageBackend {
    MySql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,

    pub storage_backend: StorageBackend,
    /// Required when `storage_backend` is MySQL.
    pub database_url: Option<String>,
    pub run_migrations: bool,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: String,
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{name}={value:?} is invalid: {e}")),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let server_addr = lookup("SERVER_ADDR").context("SERVER_ADDR must be set")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;

        let storage_backend = parse_or(
            "STORAGE_BACKEND",
            lookup("STORAGE_BACKEND"),
            StorageBackend::MySql,
        )?;

        let database_url = lookup("DATABASE_URL");
        if storage_backend == StorageBackend::MySql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE_BACKEND=mysql");
        }

        let rate_protected_per_min =
            parse_or("RATE_PROTECTED_PER_MIN", lookup("RATE_PROTECTED_PER_MIN"), 1000u32)?;
        if rate_protected_per_min == 0 {
            bail!("RATE_PROTECTED_PER_MIN must be greater than zero");
        }

        Ok(Self {
            server_addr,
            jwt_secret,
            storage_backend,
            database_url,
            run_migrations: parse_or("RUN_MIGRATIONS", lookup("RUN_MIGRATIONS"), true)?,
            rate_protected_per_min,
            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "debug".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_ADDR", "127.0.0.1:8080"),
            ("JWT_SECRET", "secret"),
            ("STORAGE_BACKEND", "memory"),
        ]))
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.rate_protected_per_min, 1000);
        assert!(config.run_migrations);
    }

    #[test]
    fn mysql_backend_requires_database_url() {
        let err = Config::from_lookup(lookup(&[
            ("SERVER_ADDR", "127.0.0.1:8080"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn rejects_zero_rate_and_garbage_values() {
        let base = [
            ("SERVER_ADDR", "127.0.0.1:8080"),
            ("JWT_SECRET", "secret"),
            ("STORAGE_BACKEND", "memory"),
        ];

        let mut zero = base.to_vec();
        zero.push(("RATE_PROTECTED_PER_MIN", "0"));
        assert!(Config::from_lookup(lookup(&zero)).is_err());

        let mut garbage = base.to_vec();
        garbage.push(("RUN_MIGRATIONS", "sometimes"));
        let err = Config::from_lookup(lookup(&garbage)).unwrap_err();
        assert!(err.to_string().contains("RUN_MIGRATIONS"));
    }
}
