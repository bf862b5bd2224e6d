use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown STORE_BACKEND {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub client_origin: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match var("STORE_BACKEND") {
            Some(v) => v.parse()?,
            None => StoreBackend::Postgres,
        };
        let database_url = var("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        let port = match var("APP_PORT") {
            Some(v) => v.parse().with_context(|| format!("invalid APP_PORT {v:?}"))?,
            None => 8080,
        };

        let jwt = JwtConfig {
            secret: var("JWT_SECRET").context("JWT_SECRET is required")?,
            ttl_days: var("JWT_TTL_DAYS")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };

        Ok(Self {
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            store,
            database_url,
            client_origin: var("CLIENT_ORIGIN").unwrap_or_else(|| "*".into()),
            jwt,
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
    fn defaults_for_memory_backend() {
        let cfg = AppConfig::from_vars(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config");
        assert_eq!(cfg.store, StoreBackend::Memory);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.client_origin, "*");
        assert_eq!(cfg.jwt.ttl_days, 7);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = AppConfig::from_vars(lookup(&[("JWT_SECRET", "s3cret")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn secret_is_required() {
        let err = AppConfig::from_vars(lookup(&[("STORE_BACKEND", "memory")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn rejects_bad_port_and_backend() {
        assert!(AppConfig::from_vars(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "x"),
            ("APP_PORT", "eighty"),
        ]))
        .is_err());
        assert!(AppConfig::from_vars(lookup(&[
            ("STORE_BACKEND", "mongo"),
            ("JWT_SECRET", "x"),
        ]))
        .is_err());
    }
}
