//! User entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};

use quill_core::domain::UserRecord;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    /// JSON array of role names.
    pub roles: Json,
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to the storage record.
impl From<Model> for UserRecord {
    fn from(model: Model) -> Self {
        let roles = model
            .roles
            .as_array()
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(|r| r.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: Some(model.id),
            email: model.email,
            roles,
            password: model.password,
        }
    }
}

/// Conversion from the storage record to SeaORM ActiveModel.
impl From<UserRecord> for ActiveModel {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id.map(Set).unwrap_or(ActiveValue::NotSet),
            email: Set(user.email),
            roles: Set(Json::from(user.roles)),
            password: Set(user.password),
        }
    }
}
