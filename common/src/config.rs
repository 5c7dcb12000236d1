//! Service configuration.
//!
//! Values come from environment variables. Loading goes through a key lookup
//! function so tests can feed a map instead of the process environment.

use std::fmt;

use crate::errors::{AppError, AppResult};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MONGODB_DATABASE: &str = "tracking";

/// Default number of candidates tried per generation call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default number of times a save conflict re-runs generation.
pub const DEFAULT_SAVE_CONFLICT_RETRIES: u32 = 2;

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub storage: StorageConfig,
    pub generator: GeneratorConfig,
}

/// Where tracking records are stored.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// MySQL connection string, required for [`StorageBackend::MySql`].
    pub database_url: Option<String>,
    /// MongoDB connection string, required for [`StorageBackend::MongoDb`].
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
}

/// Supported record stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    MySql,
    MongoDb,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::MySql => write!(f, "mysql"),
            StorageBackend::MongoDb => write!(f, "mongodb"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Tracking-number generator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Candidates drawn per generation call before giving up.
    pub max_attempts: u32,
    /// Extra generation rounds allowed when a save hits the unique index.
    pub save_conflict_retries: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            save_conflict_retries: DEFAULT_SAVE_CONFLICT_RETRIES,
        }
    }
}

impl AppConfig {
    /// Loads configuration for the named service from the process environment.
    pub fn load_with_service(service_name: &str) -> AppResult<Self> {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Loads configuration using `lookup` to resolve each variable.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("SERVER_PORT") {
            Some(v) => v
                .parse()
                .map_err(|_| AppError::Config(format!("SERVER_PORT is not a valid port: {v}")))?,
            None => DEFAULT_PORT,
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(AppError::Config(format!("unknown LOG_FORMAT: {other}")));
            }
        };

        let backend = match get("STORAGE_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("mysql") => StorageBackend::MySql,
            Some("mongodb") | Some("mongo") => StorageBackend::MongoDb,
            Some(other) => {
                return Err(AppError::Config(format!("unknown STORAGE_BACKEND: {other}")));
            }
        };

        let storage = StorageConfig {
            backend,
            database_url: get("DATABASE_URL"),
            mongodb_uri: get("MONGODB_URI"),
            mongodb_database: get("MONGODB_DATABASE")
                .unwrap_or_else(|| DEFAULT_MONGODB_DATABASE.to_string()),
        };
        match backend {
            StorageBackend::MySql if storage.database_url.is_none() => {
                return Err(AppError::Config(
                    "DATABASE_URL is required for the mysql backend".into(),
                ));
            }
            StorageBackend::MongoDb if storage.mongodb_uri.is_none() => {
                return Err(AppError::Config(
                    "MONGODB_URI is required for the mongodb backend".into(),
                ));
            }
            _ => {}
        }

        let max_attempts = parse_u32(&get, "TRACKING_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(AppError::Config(
                "TRACKING_MAX_ATTEMPTS must be at least 1".into(),
            ));
        }
        let save_conflict_retries = parse_u32(
            &get,
            "TRACKING_SAVE_CONFLICT_RETRIES",
            DEFAULT_SAVE_CONFLICT_RETRIES,
        )?;

        Ok(Self {
            service_name: service_name.to_string(),
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            log_format,
            storage,
            generator: GeneratorConfig {
                max_attempts,
                save_conflict_retries,
            },
        })
    }
}

fn parse_u32<G>(get: &G, key: &str, default: u32) -> AppResult<u32>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a non-negative integer: {v}"))),
        None => Ok(default),
    }
}
