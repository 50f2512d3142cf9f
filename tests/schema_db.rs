//! Schema creation against a live PostgreSQL. Skipped unless `DATABASE_URL` is set.

use minimalist_api::{create_schema, declare_entity, FieldDef, SqlType};
use sqlx::{Connection, PgConnection};

async fn connect() -> Option<PgConnection> {
    let url = std::env::var("DATABASE_URL").ok()?;
    match PgConnection::connect(&url).await {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("skipping: cannot connect to DATABASE_URL: {}", e);
            None
        }
    }
}

#[tokio::test]
async fn create_schema_twice_creates_nothing_the_second_time() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let name = format!("probe_{}", uuid::Uuid::new_v4().simple());
    let table = declare_entity(&name, vec![FieldDef::new("body", SqlType::Text).not_null()])
        .unwrap()
        .table();
    let tables = vec![table];

    let first = create_schema(&mut conn, &tables).await.unwrap();
    assert_eq!(first.created, vec![name.clone()]);

    let second = create_schema(&mut conn, &tables).await.unwrap();
    assert!(second.is_noop());
    assert_eq!(second.existing, vec![name.clone()]);

    let (id, created, updated): (i64, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) =
        sqlx::query_as(&format!(
            "INSERT INTO \"{}\" (body) VALUES ('x') RETURNING id, created_at, updated_at",
            name
        ))
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert!(updated >= created);

    // id is immutable once assigned
    let changed = sqlx::query(&format!("UPDATE \"{}\" SET id = id + 1000 WHERE id = $1", name))
        .bind(id)
        .execute(&mut conn)
        .await;
    assert!(changed.is_err());

    sqlx::query(&format!("DROP TABLE \"{}\"", name))
        .execute(&mut conn)
        .await
        .unwrap();
}
