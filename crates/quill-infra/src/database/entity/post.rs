//! Post entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};

use quill_core::domain::PostRecord;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub text: String,
    pub created_at: DateTimeWithTimeZone,
    pub scheduled_at: Option<DateTimeWithTimeZone>,
    pub author_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    User,
    #[sea_orm(has_many = "super::post_tag::Entity")]
    PostTag,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::post_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PostTag.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::post_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::post_tag::Relation::Post.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Storage record with the tag IDs read from the join table.
    pub fn into_record(self, tag_ids: Vec<i32>) -> PostRecord {
        PostRecord {
            id: Some(self.id),
            title: self.title,
            text: self.text,
            created_at: self.created_at.into(),
            scheduled_at: self.scheduled_at.map(Into::into),
            author_id: self.author_id,
            tag_ids,
        }
    }
}

/// Conversion from the storage record to SeaORM ActiveModel.
///
/// Tag IDs are not part of the row; the repository writes them to the
/// join table.
impl From<&PostRecord> for ActiveModel {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id.map(Set).unwrap_or(ActiveValue::NotSet),
            title: Set(post.title.clone()),
            text: Set(post.text.clone()),
            created_at: Set(post.created_at.into()),
            scheduled_at: Set(post.scheduled_at.map(Into::into)),
            author_id: Set(post.author_id),
        }
    }
}
