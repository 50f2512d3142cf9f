//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors detected while assembling the service. Always fatal at startup, never sent to a client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("entity {entity}: field '{field}' is a common column and cannot be redeclared")]
    ReservedField { entity: String, field: String },
    #[error("entity {entity}: field '{field}' declared more than once")]
    DuplicateField { entity: String, field: String },
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),
    #[error("entity '{0}' already registered with a different definition")]
    ConflictingEntity(String),
    #[error("duplicate route prefix: {0}")]
    DuplicatePrefix(String),
    #[error("invalid route prefix '{0}': must start with '/' and not end with '/'")]
    InvalidPrefix(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("connection manager is not ready")]
    NotReady,
    #[error("connection manager has been disposed")]
    Disposed,
    #[error("cannot dispose connection pool: {0} connection(s) still checked out")]
    ConnectionsInUse(usize),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("migration: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// Status and stable error code sent to clients.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::MethodNotAllowed { .. } => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotReady | AppError::Disposed => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            AppError::Db(e) => match e {
                sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "not_found"),
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                    (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
            AppError::Config(_)
            | AppError::ConnectionsInUse(_)
            | AppError::Migrate(_)
            | AppError::Io(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        // Server-side faults keep their detail in the log only.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
