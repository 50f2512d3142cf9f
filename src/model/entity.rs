//! Entity declarations: the common base shape and per-type field sets.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Columns every entity table carries. Declared fields may not reuse these names.
pub const COMMON_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

const IDENTIFIER_PATTERN: &str = "^[a-z_][a-z0-9_]{0,62}$";

/// Column storage types supported by entity declarations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Boolean,
    Integer,
    BigInt,
    Timestamptz,
    Jsonb,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Timestamptz => "TIMESTAMPTZ",
            SqlType::Jsonb => "JSONB",
        }
    }
}

/// One column of a table. Built with [`FieldDef::new`] and the chained modifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub unique: bool,
    /// SQL expression used as the column default (e.g. `TRUE`, `NOW()`).
    pub default_sql: Option<String>,
    /// Referenced table; the reference targets that table's `id`.
    pub references: Option<String>,
    /// Storage-generated identity primary key. Only the common `id` column sets this.
    pub identity: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        FieldDef {
            name: name.into(),
            sql_type,
            nullable: true,
            unique: false,
            default_sql: None,
            references: None,
            identity: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_sql(mut self, expr: impl Into<String>) -> Self {
        self.default_sql = Some(expr.into());
        self
    }

    pub fn references(mut self, table: impl Into<String>) -> Self {
        self.references = Some(table.into());
        self
    }
}

/// The three columns shared by every entity, in table order.
pub fn common_columns() -> Vec<FieldDef> {
    let mut id = FieldDef::new("id", SqlType::BigInt).not_null();
    id.identity = true;
    vec![
        id,
        FieldDef::new("created_at", SqlType::Timestamptz).not_null().default_sql("NOW()"),
        FieldDef::new("updated_at", SqlType::Timestamptz).not_null().default_sql("NOW()"),
    ]
}

/// Storage definition of one entity table: common columns first, then declared fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<FieldDef>,
}

impl TableDescriptor {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// A declared entity type: its table name and the fields beyond the common base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityType {
    name: String,
    fields: Vec<FieldDef>,
}

impl EntityType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn table(&self) -> TableDescriptor {
        let mut columns = common_columns();
        columns.extend(self.fields.iter().cloned());
        TableDescriptor {
            name: self.name.clone(),
            columns,
        }
    }
}

/// Declare an entity type. Rejects common-column redeclaration, repeated fields and non-identifier names.
pub fn declare_entity(name: &str, fields: Vec<FieldDef>) -> Result<EntityType, ConfigError> {
    let ident = Regex::new(IDENTIFIER_PATTERN).map_err(|_| ConfigError::InvalidIdentifier(name.to_string()))?;
    if !ident.is_match(name) {
        return Err(ConfigError::InvalidIdentifier(name.to_string()));
    }

    let mut seen = HashSet::new();
    for field in &fields {
        if !ident.is_match(&field.name) {
            return Err(ConfigError::InvalidIdentifier(format!("{}.{}", name, field.name)));
        }
        if COMMON_COLUMNS.contains(&field.name.as_str()) || field.identity {
            return Err(ConfigError::ReservedField {
                entity: name.to_string(),
                field: field.name.clone(),
            });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::DuplicateField {
                entity: name.to_string(),
                field: field.name.clone(),
            });
        }
        if let Some(target) = &field.references {
            if !ident.is_match(target) {
                return Err(ConfigError::InvalidIdentifier(target.clone()));
            }
        }
    }

    Ok(EntityType {
        name: name.to_string(),
        fields,
    })
}

/// Common columns as a struct. Concrete records embed it with `#[serde(flatten)]` and `#[sqlx(flatten)]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EntityBase {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted record type: a row decoder tied to its declaration.
pub trait Entity: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Serialize + Send + Unpin + 'static {
    /// Table name, also used as the route tag.
    const NAME: &'static str;

    fn entity_type() -> Result<EntityType, ConfigError>;

    fn base(&self) -> &EntityBase;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_starts_with_common_columns() {
        let entity = declare_entity("notes", vec![FieldDef::new("body", SqlType::Text).not_null()]).unwrap();
        let table = entity.table();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["id", "created_at", "updated_at", "body"]);
        assert!(table.columns[0].identity);
    }

    #[test]
    fn rejects_common_column_redeclaration() {
        for reserved in COMMON_COLUMNS {
            let err = declare_entity("notes", vec![FieldDef::new(reserved, SqlType::Text)]).unwrap_err();
            assert_eq!(
                err,
                ConfigError::ReservedField {
                    entity: "notes".into(),
                    field: reserved.into()
                }
            );
        }
    }

    #[test]
    fn rejects_duplicate_fields() {
        let err = declare_entity(
            "notes",
            vec![FieldDef::new("body", SqlType::Text), FieldDef::new("body", SqlType::Jsonb)],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField { .. }));
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(declare_entity("Notes", vec![]).is_err());
        assert!(declare_entity("notes", vec![FieldDef::new("bad name", SqlType::Text)]).is_err());
        assert!(declare_entity("notes", vec![FieldDef::new("owner_id", SqlType::BigInt).references("x\"y")]).is_err());
    }
}
