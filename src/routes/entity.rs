//! Read routes for one registered entity type.

use crate::error::ConfigError;
use crate::handlers::{list, read, EntityState};
use crate::model::Entity;
use crate::routes::ApiRouter;
use crate::service::EntityQueries;
use crate::store::ConnectionManager;
use std::sync::Arc;

/// `GET /` lists rows, `GET /:id` reads one.
pub fn entity_routes<E: Entity>(connections: Arc<ConnectionManager>) -> Result<ApiRouter, ConfigError> {
    let table = E::entity_type()?.table();
    let state = EntityState {
        connections,
        queries: Arc::new(EntityQueries::for_table(&table)),
    };
    Ok(ApiRouter::<EntityState>::new(E::NAME)
        .get("/", &format!("List {}", E::NAME), list::<E>)
        .get("/:id", &format!("Read one of {} by id", E::NAME), read::<E>)
        .with_state(state))
}
