//! Prepare the database schema: DDL for registered entity tables, or versioned migrations.
//! Auto-creation only adds what is missing; existing tables are never altered.

use crate::error::AppError;
use crate::model::{FieldDef, TableDescriptor};
use sqlx::{Connection, PgConnection, PgPool};
use std::path::Path;

/// Shared trigger function: refreshes `updated_at`, pins `created_at`, rejects `id` changes.
pub const SET_UPDATED_AT_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION set_updated_at() RETURNS trigger AS $$
BEGIN
    IF NEW.id IS DISTINCT FROM OLD.id THEN
        RAISE EXCEPTION 'column "id" of relation "%" is immutable', TG_TABLE_NAME;
    END IF;
    NEW.created_at := OLD.created_at;
    NEW.updated_at := GREATEST(NOW(), OLD.created_at);
    RETURN NEW;
END;
$$ LANGUAGE plpgsql
"#;

/// Outcome of one `create_schema` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

impl SchemaReport {
    /// True when nothing had to be created.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

pub(crate) fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn column_sql(column: &FieldDef) -> String {
    let mut def = format!("{} {}", quote(&column.name), column.sql_type.as_sql());
    if column.identity {
        def.push_str(" GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY");
        return def;
    }
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if column.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(ref expr) = column.default_sql {
        def.push_str(" DEFAULT ");
        def.push_str(expr);
    }
    if let Some(ref target) = column.references {
        def.push_str(&format!(" REFERENCES {} (\"id\")", quote(target)));
    }
    def
}

/// `CREATE TABLE IF NOT EXISTS` for one entity table, including the timestamp ordering check.
pub fn create_table_sql(table: &TableDescriptor) -> String {
    let mut defs: Vec<String> = table.columns.iter().map(column_sql).collect();
    defs.push(format!(
        "CONSTRAINT {} CHECK (\"updated_at\" >= \"created_at\")",
        quote(&format!("{}_updated_after_created", table.name))
    ));
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quote(&table.name),
        defs.join(",\n  ")
    )
}

pub fn updated_at_trigger_sql(table: &TableDescriptor) -> String {
    format!(
        "CREATE TRIGGER {} BEFORE UPDATE ON {} FOR EACH ROW EXECUTE FUNCTION set_updated_at()",
        quote(&format!("{}_set_updated_at", table.name)),
        quote(&table.name)
    )
}

async fn table_exists(conn: &mut PgConnection, name: &str) -> Result<bool, AppError> {
    let exists: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = $1)",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists.0)
}

/// Create every table in `tables` that does not exist yet, in order, inside one transaction.
/// Safe to call on every startup: a second call with the same tables creates nothing.
pub async fn create_schema(conn: &mut PgConnection, tables: &[TableDescriptor]) -> Result<SchemaReport, AppError> {
    let mut tx = conn.begin().await?;
    sqlx::query(SET_UPDATED_AT_FUNCTION).execute(&mut *tx).await?;

    let mut report = SchemaReport::default();
    for table in tables {
        if table_exists(&mut *tx, &table.name).await? {
            tracing::debug!(table = %table.name, "table exists, leaving untouched");
            report.existing.push(table.name.clone());
            continue;
        }
        let ddl = create_table_sql(table);
        tracing::debug!(sql = %ddl, "create table");
        sqlx::query(&ddl).execute(&mut *tx).await?;
        sqlx::query(&updated_at_trigger_sql(table)).execute(&mut *tx).await?;
        report.created.push(table.name.clone());
    }

    tx.commit().await?;
    tracing::info!(created = ?report.created, existing = report.existing.len(), "schema prepared");
    Ok(report)
}

/// Run versioned migrations from `dir` (sqlx migration file layout).
pub async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<(), AppError> {
    let migrator = sqlx::migrate::Migrator::new(dir).await?;
    migrator.run(pool).await?;
    tracing::info!(dir = %dir.display(), "migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{declare_entity, default_registry, SqlType};

    #[test]
    fn table_ddl_has_common_columns_and_check() {
        let table = declare_entity("notes", vec![FieldDef::new("body", SqlType::Text).not_null()])
            .unwrap()
            .table();
        let sql = create_table_sql(&table);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"notes\""));
        assert!(sql.contains("\"id\" BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"));
        assert!(sql.contains("\"created_at\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
        assert!(sql.contains("\"updated_at\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
        assert!(sql.contains("\"body\" TEXT NOT NULL"));
        assert!(sql.contains("CHECK (\"updated_at\" >= \"created_at\")"));
    }

    #[test]
    fn field_modifiers_render() {
        let tables = default_registry().unwrap().all_tables();
        let users = create_table_sql(&tables[0]);
        assert!(users.contains("\"email\" TEXT NOT NULL UNIQUE"));
        assert!(users.contains("\"is_active\" BOOLEAN NOT NULL DEFAULT TRUE"));
        let items = create_table_sql(&tables[1]);
        assert!(items.contains("\"owner_id\" BIGINT REFERENCES \"users\" (\"id\")"));
    }

    #[test]
    fn trigger_names_are_per_table() {
        let table = declare_entity("notes", vec![]).unwrap().table();
        assert_eq!(
            updated_at_trigger_sql(&table),
            "CREATE TRIGGER \"notes_set_updated_at\" BEFORE UPDATE ON \"notes\" FOR EACH ROW EXECUTE FUNCTION set_updated_at()"
        );
    }

    #[test]
    fn quote_escapes_double_quotes() {
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }
}
