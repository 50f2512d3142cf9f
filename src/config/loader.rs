//! Load settings from environment variables (or any key lookup, for tests).

use crate::config::{parse_cors_origins, validate_prefix, DatabaseSettings, SchemaMode, Settings};
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PROJECT_NAME: &str = "Minimalist API";
pub const DEFAULT_API_V1_STR: &str = "/api/v1";
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/minimalist";

impl Settings {
    /// Read settings from the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a key lookup. Missing keys fall back to defaults; malformed values fail.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_v1_str = get("API_V1_STR", DEFAULT_API_V1_STR);
        validate_prefix(&api_v1_str).map_err(|_| ConfigError::Invalid {
            key: "API_V1_STR",
            reason: format!("'{}' must start with '/' and not end with '/'", api_v1_str),
        })?;

        let backend_cors_origins = parse_cors_origins(&get("BACKEND_CORS_ORIGINS", ""))?;

        let migrations_dir = PathBuf::from(get("MIGRATIONS_DIR", "migrations"));
        let schema_mode = SchemaMode::parse(&get("SCHEMA_MODE", "auto_create"), migrations_dir)?;

        let max_connections: u32 = parse_number("DB_MAX_CONNECTIONS", &get("DB_MAX_CONNECTIONS", "5"))?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                reason: "must be greater than zero".into(),
            });
        }
        let acquire_timeout_secs: u64 =
            parse_number("DB_ACQUIRE_TIMEOUT_SECS", &get("DB_ACQUIRE_TIMEOUT_SECS", "5"))?;

        let bind_addr = SocketAddr::from_str(&get("BIND_ADDR", "0.0.0.0:8000")).map_err(|e| ConfigError::Invalid {
            key: "BIND_ADDR",
            reason: e.to_string(),
        })?;

        Ok(Settings {
            project_name: get("PROJECT_NAME", DEFAULT_PROJECT_NAME),
            version: get("VERSION", env!("CARGO_PKG_VERSION")),
            description: get("DESCRIPTION", ""),
            api_v1_str,
            backend_cors_origins,
            environment: get("ENVIRONMENT", "development"),
            database: DatabaseSettings {
                url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections,
                acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            },
            schema_mode,
            bind_addr,
            max_body_bytes: parse_number("MAX_BODY_BYTES", &get("MAX_BODY_BYTES", "1048576"))?,
        })
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: format!("'{}': {}", raw, e),
    })
}
