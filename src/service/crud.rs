//! Generic entity reads against PostgreSQL.

use crate::error::AppError;
use crate::model::{Entity, TableDescriptor};
use crate::sql::{select_by_id, select_list};
use sqlx::PgConnection;

/// Statements for one entity, built once when its routes are assembled.
#[derive(Clone, Debug)]
pub struct EntityQueries {
    pub list: String,
    pub read: String,
}

impl EntityQueries {
    pub fn for_table(table: &TableDescriptor) -> Self {
        EntityQueries {
            list: select_list(table),
            read: select_by_id(table),
        }
    }
}

pub struct EntityService;

impl EntityService {
    pub async fn list<E: Entity>(conn: &mut PgConnection, queries: &EntityQueries) -> Result<Vec<E>, AppError> {
        tracing::debug!(entity = E::NAME, sql = %queries.list, "query");
        let rows = sqlx::query_as::<_, E>(&queries.list).fetch_all(conn).await?;
        Ok(rows)
    }

    /// Fetch one row by id. `None` when no such row exists.
    pub async fn read<E: Entity>(
        conn: &mut PgConnection,
        queries: &EntityQueries,
        id: i64,
    ) -> Result<Option<E>, AppError> {
        tracing::debug!(entity = E::NAME, sql = %queries.read, id, "query");
        let row = sqlx::query_as::<_, E>(&queries.read)
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }
}
