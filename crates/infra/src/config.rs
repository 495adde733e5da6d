//! Configuration loading and representation.
//!
//! Values come from the process environment, after loading a `.env` file
//! when one exists.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Which store the process runs against.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory { seed_demo_data: bool },
    Postgres { url: String, max_connections: u32 },
}

impl core::fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreBackend::InMemory { seed_demo_data } => f
                .debug_struct("InMemory")
                .field("seed_demo_data", seed_demo_data)
                .finish(),
            // The URL may carry credentials.
            StoreBackend::Postgres {
                max_connections, ..
            } => f
                .debug_struct("Postgres")
                .field("max_connections", max_connections)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub backend: StoreBackend,
}

impl AppConfig {
    /// Read `LISTEN_ADDR`, `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS` and
    /// `SEED_DEMO_DATA`. Without `DATABASE_URL` the in-memory store is used.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_raw = lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("LISTEN_ADDR", &listen_raw, e))?;

        let database_url = lookup("DATABASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let backend = match database_url {
            Some(url) => {
                let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
                    Some(raw) => parse_max_connections(&raw)?,
                    None => DEFAULT_MAX_CONNECTIONS,
                };
                StoreBackend::Postgres {
                    url,
                    max_connections,
                }
            }
            None => StoreBackend::InMemory {
                seed_demo_data: match lookup("SEED_DEMO_DATA") {
                    Some(raw) => parse_bool("SEED_DEMO_DATA", &raw)?,
                    None => false,
                },
            },
        };

        Ok(Self {
            listen_addr,
            backend,
        })
    }
}

fn parse_max_connections(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::invalid(
            "DATABASE_MAX_CONNECTIONS",
            raw,
            "must be at least 1",
        )),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::invalid("DATABASE_MAX_CONNECTIONS", raw, e)),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected true or false")),
    }
}
