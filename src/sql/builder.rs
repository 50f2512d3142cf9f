//! Builds parameterized SELECT statements from a table descriptor.

use crate::migration::quote as quoted;
use crate::model::TableDescriptor;

/// Rows returned by a list query. There are no paging parameters; lists are capped.
pub const LIST_LIMIT: u32 = 100;

fn select_column_list(table: &TableDescriptor) -> String {
    table.column_names().map(quoted).collect::<Vec<_>>().join(", ")
}

/// SELECT every column, oldest first, capped at [`LIST_LIMIT`].
pub fn select_list(table: &TableDescriptor) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY \"id\" LIMIT {}",
        select_column_list(table),
        quoted(&table.name),
        LIST_LIMIT
    )
}

/// SELECT by primary key. Caller binds the id as `$1`.
pub fn select_by_id(table: &TableDescriptor) -> String {
    format!(
        "SELECT {} FROM {} WHERE \"id\" = $1",
        select_column_list(table),
        quoted(&table.name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{declare_entity, FieldDef, SqlType};

    #[test]
    fn selects_every_declared_column() {
        let table = declare_entity("notes", vec![FieldDef::new("body", SqlType::Text)])
            .unwrap()
            .table();
        assert_eq!(
            select_list(&table),
            "SELECT \"id\", \"created_at\", \"updated_at\", \"body\" FROM \"notes\" ORDER BY \"id\" LIMIT 100"
        );
        assert_eq!(
            select_by_id(&table),
            "SELECT \"id\", \"created_at\", \"updated_at\", \"body\" FROM \"notes\" WHERE \"id\" = $1"
        );
    }
}
