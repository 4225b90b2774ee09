//! # Service Configuration
//!
//! Read once at startup from the environment. Secrets (`AUTH_TOKEN`,
//! `PAYMENT_WEBHOOK_SECRET`, the database URL) are redacted from `Debug`
//! output so the config can be logged.
//!
//! | Variable                  | Default   | Meaning                                   |
//! |---------------------------|-----------|-------------------------------------------|
//! | `PORT`                    | 8080      | HTTP listen port                          |
//! | `AUTH_TOKEN`              | unset     | Bearer secret; unset disables auth        |
//! | `PAYMENT_WEBHOOK_SECRET`  | unset     | Payment callback secret; unset rejects all |
//! | `DATABASE_URL`            | unset     | Postgres URL; unset uses the memory store |
//! | `DB_MAX_CONNECTIONS`      | 20        | Pool ceiling                              |
//! | `DB_MIN_CONNECTIONS`      | 2         | Idle connections kept open                |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | 5         | Wait for a pooled connection              |
//! | `LOG_FORMAT`              | text      | `json` for structured log lines           |

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    NotANumber { var: &'static str, value: String },

    #[error("DB_MIN_CONNECTIONS ({min}) exceeds DB_MAX_CONNECTIONS ({max})")]
    PoolBounds { min: u32, max: u32 },
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Postgres connection settings.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

/// Top-level service configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Static bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Shared secret expected in `X-Payment-Signature`.
    pub payment_webhook_secret: Option<String>,
    /// `None` runs on the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "payment_webhook_secret",
                &self.payment_webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("database", &self.database)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            payment_webhook_secret: None,
            database: None,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let port = number(&lookup, "PORT", 8080u16)?;
        let database = match non_empty("DATABASE_URL") {
            Some(url) => {
                let max_connections = number(&lookup, "DB_MAX_CONNECTIONS", 20u32)?;
                let min_connections = number(&lookup, "DB_MIN_CONNECTIONS", 2u32)?;
                if min_connections > max_connections {
                    return Err(ConfigError::PoolBounds {
                        min: min_connections,
                        max: max_connections,
                    });
                }
                let acquire_secs = number(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5u64)?;
                Some(DatabaseConfig {
                    url,
                    max_connections,
                    min_connections,
                    acquire_timeout: Duration::from_secs(acquire_secs),
                })
            }
            None => None,
        };
        let log_format = match non_empty("LOG_FORMAT") {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            port,
            auth_token: non_empty("AUTH_TOKEN"),
            payment_webhook_secret: non_empty("PAYMENT_WEBHOOK_SECRET"),
            database,
            log_format,
        })
    }
}

fn number<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::NotANumber { var, value }),
        _ => Ok(default),
    }
}
