//! Entity read handlers: list and read by id. Each request checks out its own connection.

use crate::error::AppError;
use crate::model::Entity;
use crate::response::{success_many, success_one_ok};
use crate::service::{EntityQueries, EntityService};
use crate::store::ConnectionManager;
use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct EntityState {
    pub connections: Arc<ConnectionManager>,
    pub queries: Arc<EntityQueries>,
}

pub async fn list<E: Entity>(State(state): State<EntityState>) -> Result<impl IntoResponse, AppError> {
    let mut handle = state.connections.acquire().await?;
    let rows = EntityService::list::<E>(&mut handle, &state.queries).await?;
    Ok(success_many(rows))
}

pub async fn read<E: Entity>(
    State(state): State<EntityState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id.map_err(|e| AppError::BadRequest(format!("{} id: {}", E::NAME, e.body_text())))?;
    let mut handle = state.connections.acquire().await?;
    let row = EntityService::read::<E>(&mut handle, &state.queries, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", E::NAME, id)))?;
    tracing::debug!(entity = E::NAME, id = row.base().id, "read row");
    Ok(success_one_ok(row))
}
