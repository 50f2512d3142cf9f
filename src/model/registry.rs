//! Schema registry: every entity table definition, collected once before schema creation.

use crate::error::ConfigError;
use crate::model::entity::{EntityType, TableDescriptor};

/// Constructor for an entity type, as listed when building a registry.
pub type EntityConstructor = fn() -> Result<EntityType, ConfigError>;

/// Ordered collection of registered entity types. Built at startup, shared read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    entities: Vec<EntityType>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry { entities: Vec::new() }
    }

    /// Build a registry from an explicit list of entity constructors, in dependency order.
    pub fn from_constructors(constructors: &[EntityConstructor]) -> Result<Self, ConfigError> {
        let mut registry = SchemaRegistry::new();
        for constructor in constructors {
            registry.register(constructor()?)?;
        }
        Ok(registry)
    }

    /// Add an entity type. Registering an identical type again is a no-op;
    /// a different definition under a taken name is an error.
    pub fn register(&mut self, entity: EntityType) -> Result<(), ConfigError> {
        match self.entities.iter().find(|e| e.name() == entity.name()) {
            Some(existing) if *existing == entity => Ok(()),
            Some(_) => Err(ConfigError::ConflictingEntity(entity.name().to_string())),
            None => {
                tracing::debug!(entity = %entity.name(), "registered entity");
                self.entities.push(entity);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&EntityType> {
        self.entities.iter().find(|e| e.name() == name)
    }

    /// Table definitions for every registered entity, in registration order.
    pub fn all_tables(&self) -> Vec<TableDescriptor> {
        self.entities.iter().map(EntityType::table).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::{declare_entity, FieldDef, SqlType};

    fn notes() -> Result<EntityType, ConfigError> {
        declare_entity("notes", vec![FieldDef::new("body", SqlType::Text)])
    }

    fn tags() -> Result<EntityType, ConfigError> {
        declare_entity("tags", vec![FieldDef::new("label", SqlType::Text).not_null()])
    }

    #[test]
    fn register_is_idempotent() {
        let mut registry = SchemaRegistry::new();
        registry.register(notes().unwrap()).unwrap();
        registry.register(notes().unwrap()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.all_tables().len(), 1);
    }

    #[test]
    fn conflicting_definition_fails() {
        let mut registry = SchemaRegistry::new();
        registry.register(notes().unwrap()).unwrap();
        let other = declare_entity("notes", vec![FieldDef::new("body", SqlType::Jsonb)]).unwrap();
        assert_eq!(
            registry.register(other),
            Err(ConfigError::ConflictingEntity("notes".into()))
        );
    }

    #[test]
    fn tables_keep_registration_order() {
        let registry = SchemaRegistry::from_constructors(&[tags, notes, tags]).unwrap();
        let names: Vec<String> = registry.all_tables().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["tags", "notes"]);
        assert!(registry.get("notes").is_some());
        assert!(registry.get("missing").is_none());
    }
}
