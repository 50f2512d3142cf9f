use crate::error::ConfigError;
use crate::model::entity::{declare_entity, Entity, EntityBase, EntityType, FieldDef, SqlType};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub base: EntityBase,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
}

impl Entity for User {
    const NAME: &'static str = "users";

    fn entity_type() -> Result<EntityType, ConfigError> {
        declare_entity(
            Self::NAME,
            vec![
                FieldDef::new("email", SqlType::Text).not_null().unique(),
                FieldDef::new("full_name", SqlType::Text),
                FieldDef::new("is_active", SqlType::Boolean).not_null().default_sql("TRUE"),
            ],
        )
    }

    fn base(&self) -> &EntityBase {
        &self.base
    }
}
