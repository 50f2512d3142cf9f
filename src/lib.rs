//! Minimalist API: a PostgreSQL-backed REST service skeleton.
//!
//! The interesting part is the lifecycle: settings are loaded, entity tables are registered,
//! the versioned router is composed, and the schema is prepared before the first request is served.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod migration;
pub mod model;
pub mod openapi;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use app::{cors_layer, shutdown_signal, Application};
pub use config::{SchemaMode, Settings};
pub use error::{AppError, ConfigError};
pub use lifecycle::Lifecycle;
pub use migration::{create_schema, SchemaReport};
pub use model::{declare_entity, default_registry, Entity, EntityBase, EntityType, FieldDef, SchemaRegistry, SqlType, TableDescriptor};
pub use routes::{api_router, ApiRouter, Resolution, RouterComposer};
pub use state::AppState;
pub use store::{ConnectionManager, ConnectionState, PooledHandle};
