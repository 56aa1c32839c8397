//! Server configuration read from the environment.
//!
//! | Variable          | Default        |
//! |-------------------|----------------|
//! | `HOST`            | `0.0.0.0`      |
//! | `PORT`            | `3000`         |
//! | `APP_CORS_ORIGIN` | any origin     |
//! | `SCHEDULE_WINDOW` | `single-month` |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::scheduler::WindowBound;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Outcome of loading a `.env` file at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvFile {
    Loaded(PathBuf),
    Absent,
    /// Present but unreadable or malformed.
    Invalid(String),
}

impl EnvFile {
    pub fn from_result(result: Result<PathBuf, dotenvy::Error>) -> Self {
        match result {
            Ok(path) => Self::Loaded(path),
            Err(e) if e.not_found() => Self::Absent,
            Err(e) => Self::Invalid(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Exact origin allowed by CORS; `None` allows any origin.
    pub cors_origin: Option<String>,
    /// Window bound used when expanding training schedules.
    pub schedule_window: WindowBound,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origin: None,
            schedule_window: WindowBound::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    /// Build configuration from the process environment.
    ///
    /// Unset variables take their defaults; set but unparsable ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match non_empty_var("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "PORT",
                message: format!("'{}': {}", raw, e),
            })?,
            None => defaults.port,
        };

        let schedule_window = match non_empty_var("SCHEDULE_WINDOW") {
            Some(raw) => raw
                .parse()
                .map_err(|message| ConfigError::InvalidValue {
                    key: "SCHEDULE_WINDOW",
                    message,
                })?,
            None => defaults.schedule_window,
        };

        Ok(Self {
            host: non_empty_var("HOST").unwrap_or(defaults.host),
            port,
            cors_origin: non_empty_var("APP_CORS_ORIGIN"),
            schedule_window,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                key: "HOST",
                message: format!("'{}': {}", self.host, e),
            })
    }
}
