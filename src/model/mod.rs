//! Persisted entity types and the registry that collects their tables.

pub mod entity;
pub mod item;
pub mod registry;
pub mod user;

pub use entity::*;
pub use item::Item;
pub use registry::{EntityConstructor, SchemaRegistry};
pub use user::User;

use crate::error::ConfigError;

/// Registry of every entity the service persists. Referenced tables come first.
pub fn default_registry() -> Result<SchemaRegistry, ConfigError> {
    SchemaRegistry::from_constructors(&[User::entity_type, Item::entity_type])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_orders_users_before_items() {
        let registry = default_registry().unwrap();
        let tables = registry.all_tables();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "users");
        assert_eq!(tables[1].name, "items");
        let owner = tables[1].columns.iter().find(|c| c.name == "owner_id").unwrap();
        assert_eq!(owner.references.as_deref(), Some("users"));
    }
}
