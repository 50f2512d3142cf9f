//! Typed service settings.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// How the database schema is prepared at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaMode {
    /// Create every registered table that is missing (development convenience).
    AutoCreate,
    /// Run versioned migrations from a directory.
    Migrate { dir: PathBuf },
    /// Leave the schema alone.
    None,
}

impl SchemaMode {
    pub fn parse(raw: &str, migrations_dir: PathBuf) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto_create" | "autocreate" | "auto" => Ok(SchemaMode::AutoCreate),
            "migrate" => Ok(SchemaMode::Migrate { dir: migrations_dir }),
            "none" | "off" => Ok(SchemaMode::None),
            other => Err(ConfigError::Invalid {
                key: "SCHEMA_MODE",
                reason: format!("expected auto_create, migrate or none; got '{}'", other),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// Everything the service reads from its environment.
#[derive(Clone, Debug)]
pub struct Settings {
    pub project_name: String,
    pub version: String,
    pub description: String,
    /// Version prefix for the routed API, e.g. `/api/v1`.
    pub api_v1_str: String,
    /// Allowed browser origins. Empty disables cross-origin headers entirely.
    pub backend_cors_origins: Vec<String>,
    pub environment: String,
    pub database: DatabaseSettings,
    pub schema_mode: SchemaMode,
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,
}

impl Settings {
    pub fn openapi_path(&self) -> String {
        format!("{}/openapi.json", self.api_v1_str)
    }

    pub fn docs_path(&self) -> String {
        format!("{}/docs", self.api_v1_str)
    }
}
