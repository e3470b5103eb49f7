//! Runtime configuration read from the environment (and a `.env` file, if present).
//!
//! | key                    | default                                          |
//! |------------------------|--------------------------------------------------|
//! | `ACCESS_KEY`           | empty (the provider rejects the request later)   |
//! | `WEATHER_BASE_URL`     | [`DEFAULT_BASE_URL`]                             |
//! | `WEATHER_TIMEOUT_SECS` | 30                                               |
//! | `DB_NAME`              | `weather_data`                                   |
//! | `DB_HOST`              | empty                                            |
//! | `DB_PORT`              | 5432                                             |
//! | `DB_USER`              | `APP_USER`, else empty                           |
//! | `DB_PASSWORD`          | empty                                            |
//! | `DB_PATH`              | `<data dir>/weather_ingest/<DB_NAME>.db`         |
//! | `DB_BUSY_TIMEOUT_MS`   | 5000                                             |
//! | `PLATFORM_NAME`        | `Leaflink`                                       |
//! | `DELETE_CHUNK_SIZE`    | 1000                                             |
//!
//! The store is a SQLite file, so `DB_NAME` picks the file and the connection
//! keys (`DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`) are carried on
//! [`DatabaseConfig`] for reporting only. Presence is never checked here. Only
//! malformed numbers are rejected.

use crate::client::weather_client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::types::forecast_schema::DEFAULT_PLATFORM_NAME;
use crate::utils::default_database_path;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Keys per `DELETE` statement when none is configured.
pub const DEFAULT_DELETE_CHUNK_SIZE: usize = 1000;

/// How long SQLite waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Database name used when `DB_NAME` is unset.
pub const DEFAULT_DATABASE_NAME: &str = "weather_data";

/// Port reported when `DB_PORT` is unset.
pub const DEFAULT_DATABASE_PORT: u16 = 5432;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable '{key}' must be a whole number, got '{value}'")]
    InvalidNumber {
        key: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Environment variable '{key}' must be greater than zero")]
    ZeroValue { key: &'static str },

    #[error("Environment variable '{key}' must be a port number, got '{value}'")]
    InvalidPort {
        key: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Could not determine the user data directory; set DB_PATH")]
    DataDirResolution,
}

/// Weather provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub access_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

// The access key stays out of debug output.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("access_key", &if self.access_key.is_empty() { "" } else { "***" })
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Database settings.
///
/// `path` is the SQLite file that is actually opened. `name`, `host`, `port`,
/// `user` and `password` describe the database the way a server deployment
/// would name it; they show up in log lines and [`DatabaseConfig::label`].
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub path: PathBuf,
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    /// A config for the file at `path`, every other field at its default.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: DEFAULT_DATABASE_NAME.to_string(),
            host: String::new(),
            port: DEFAULT_DATABASE_PORT,
            user: String::new(),
            password: String::new(),
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// `user@host:port/name`, leaving out the parts that are empty. Never
    /// includes the password.
    pub fn label(&self) -> String {
        let mut label = String::new();
        if !self.user.is_empty() {
            label.push_str(&self.user);
            label.push('@');
        }
        if !self.host.is_empty() {
            label.push_str(&format!("{}:{}/", self.host, self.port));
        }
        label.push_str(&self.name);
        label
    }
}

// The password stays out of debug output.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("path", &self.path)
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

/// Everything the ingest pipeline needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub platform_name: String,
    pub delete_chunk_size: usize,
}

impl IngestConfig {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // a missing .env file is fine
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which returns `None` for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match get("WEATHER_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse_positive("WEATHER_TIMEOUT_SECS", &value)?),
            None => DEFAULT_TIMEOUT,
        };
        let busy_timeout = match get("DB_BUSY_TIMEOUT_MS") {
            Some(value) => Duration::from_millis(parse_number("DB_BUSY_TIMEOUT_MS", &value)?),
            None => DEFAULT_BUSY_TIMEOUT,
        };
        let delete_chunk_size = match get("DELETE_CHUNK_SIZE") {
            Some(value) => parse_positive("DELETE_CHUNK_SIZE", &value)? as usize,
            None => DEFAULT_DELETE_CHUNK_SIZE,
        };
        let name = get("DB_NAME").unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string());
        let port = match get("DB_PORT") {
            Some(value) => parse_port("DB_PORT", &value)?,
            None => DEFAULT_DATABASE_PORT,
        };
        let path = match get("DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_database_path(&name).ok_or(ConfigError::DataDirResolution)?,
        };
        let database = DatabaseConfig {
            host: get("DB_HOST").unwrap_or_default(),
            port,
            user: get("DB_USER").or_else(|| get("APP_USER")).unwrap_or_default(),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            name,
            path,
            busy_timeout,
        };

        Ok(Self {
            api: ApiConfig {
                access_key: lookup("ACCESS_KEY").unwrap_or_default(),
                base_url: get("WEATHER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout,
            },
            database,
            platform_name: get("PLATFORM_NAME")
                .unwrap_or_else(|| DEFAULT_PLATFORM_NAME.to_string()),
            delete_chunk_size,
        })
    }
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|source| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
            source,
        })
}

fn parse_port(key: &'static str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|source| ConfigError::InvalidPort {
            key,
            value: value.to_string(),
            source,
        })
}

fn parse_positive(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match parse_number(key, value)? {
        0 => Err(ConfigError::ZeroValue { key }),
        n => Ok(n),
    }
}
