use crate::error::ConfigError;
use crate::model::entity::{declare_entity, Entity, EntityBase, EntityType, FieldDef, SqlType};
use crate::model::user::User;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub base: EntityBase,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Option<i64>,
}

impl Entity for Item {
    const NAME: &'static str = "items";

    fn entity_type() -> Result<EntityType, ConfigError> {
        declare_entity(
            Self::NAME,
            vec![
                FieldDef::new("title", SqlType::Text).not_null(),
                FieldDef::new("description", SqlType::Text),
                FieldDef::new("owner_id", SqlType::BigInt).references(User::NAME),
            ],
        )
    }

    fn base(&self) -> &EntityBase {
        &self.base
    }
}
