//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for `CALLBACK_CACHE_TTL_SECS` (one week)
pub const MAX_CALLBACK_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Where ledger state lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Non-durable; for local runs and demos
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("STORAGE_BACKEND")),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (postgres backend only)
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub storage_backend: StorageBackend,

    /// Key used to verify payment provider signatures
    pub midtrans_server_key: String,

    /// How long an applied payment reference stays in the local cache
    pub callback_cache_ttl: Duration,

    /// Sender address for outgoing mail
    pub mail_from: String,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let storage_backend: StorageBackend = var("STORAGE_BACKEND", "postgres").parse()?;

        let database_url = lookup("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = var("HOST", "127.0.0.1");

        let port = var("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = var("ENVIRONMENT", "development");

        let midtrans_server_key = match lookup("MIDTRANS_SERVER_KEY") {
            Some(key) if !key.trim().is_empty() => key,
            _ if environment == "production" => {
                return Err(ConfigError::MissingEnv("MIDTRANS_SERVER_KEY"));
            }
            _ => String::new(),
        };

        let callback_cache_ttl = var("CALLBACK_CACHE_TTL_SECS", "600")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs <= MAX_CALLBACK_CACHE_TTL_SECS)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidValue("CALLBACK_CACHE_TTL_SECS"))?;

        let mail_from = var("MAIL_FROM", "Course Marketplace <no-reply@localhost>");

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | Some("") | None => LogFormat::Pretty,
            Some(_) => return Err(ConfigError::InvalidValue("LOG_FORMAT")),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            storage_backend,
            midtrans_server_key,
            callback_cache_ttl,
            mail_from,
            log_format,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
