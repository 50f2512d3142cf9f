//! Route assembly: shell routes plus the versioned API surface.

pub mod common;
pub mod composer;
pub mod entity;

pub use common::common_routes;
pub use composer::{ApiRouter, Mount, Resolution, RouteSpec, RouterComposer};
pub use entity::entity_routes;

use crate::error::ConfigError;
use crate::model::{Item, User};
use crate::store::ConnectionManager;
use std::sync::Arc;

/// Version-1 API: one handler group per registered entity.
pub fn api_router(version_prefix: &str, connections: Arc<ConnectionManager>) -> Result<RouterComposer, ConfigError> {
    RouterComposer::new(version_prefix)?
        .with("/users", entity_routes::<User>(connections.clone())?)?
        .with("/items", entity_routes::<Item>(connections)?)
}
