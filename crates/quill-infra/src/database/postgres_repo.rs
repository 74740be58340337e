//! PostgreSQL repository implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbConn, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait, TryIntoModel,
};

use quill_core::domain::{PostRecord, TagRecord, UserRecord};
use quill_core::error::RepoError;
use quill_core::ports::{
    BaseRepository, ChangeSet, ChangeWriter, PostRepository, SavedIds, TagRepository,
    UserRepository,
};

use super::entity::post::{self, Entity as PostEntity};
use super::entity::post_tag::{self, Entity as PostTagEntity};
use super::entity::tag::{self, Entity as TagEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::mask_email;
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL tag repository.
pub type PostgresTagRepository = PostgresBaseRepository<TagEntity>;

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn find_many(&self, ids: &[i32]) -> Result<Vec<TagRecord>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = TagEntity::find()
            .filter(tag::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(tag::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// PostgreSQL post repository.
///
/// Posts own the post/tag association, so this repository keeps the join
/// table in step with each saved record.
pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// Attach tag IDs from the join table to each post row.
    async fn with_tags(&self, models: Vec<post::Model>) -> Result<Vec<PostRecord>, RepoError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = models.iter().map(|m| m.id).collect();
        let links = PostTagEntity::find()
            .filter(post_tag::Column::PostId.is_in(ids))
            .order_by_asc(post_tag::Column::TagId)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        let mut by_post: HashMap<i32, Vec<i32>> = HashMap::new();
        for link in links {
            by_post.entry(link.post_id).or_default().push(link.tag_id);
        }

        Ok(models
            .into_iter()
            .map(|m| {
                let tags = by_post.remove(&m.id).unwrap_or_default();
                m.into_record(tags)
            })
            .collect())
    }
}

/// Insert or update a post row and replace its join rows.
async fn write_post<C>(conn: &C, entity: PostRecord) -> Result<PostRecord, RepoError>
where
    C: ConnectionTrait,
{
    let active_model = post::ActiveModel::from(&entity);
    let model = if entity.id.is_some() {
        active_model.update(conn).await
    } else {
        active_model.insert(conn).await
    }
    .map_err(map_db_err)?;

    let mut tag_ids = entity.tag_ids;
    tag_ids.sort_unstable();
    tag_ids.dedup();
    replace_links(conn, model.id, &tag_ids).await?;

    Ok(model.into_record(tag_ids))
}

async fn replace_links<C>(conn: &C, post_id: i32, tag_ids: &[i32]) -> Result<(), RepoError>
where
    C: ConnectionTrait,
{
    PostTagEntity::delete_many()
        .filter(post_tag::Column::PostId.eq(post_id))
        .exec(conn)
        .await
        .map_err(map_db_err)?;

    if tag_ids.is_empty() {
        return Ok(());
    }
    let rows = tag_ids.iter().map(|&tag_id| post_tag::ActiveModel {
        post_id: Set(post_id),
        tag_id: Set(tag_id),
    });
    PostTagEntity::insert_many(rows)
        .exec_without_returning(conn)
        .await
        .map_err(map_db_err)?;
    Ok(())
}

#[async_trait]
impl BaseRepository<PostRecord, i32> for PostgresPostRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<PostRecord>, RepoError> {
        let Some(model) = PostEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        Ok(self.with_tags(vec![model]).await?.pop())
    }

    async fn find_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        let models = PostEntity::find()
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        self.with_tags(models).await
    }

    async fn save(&self, entity: PostRecord) -> Result<PostRecord, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let saved = write_post(&txn, entity).await?;
        txn.commit().await.map_err(map_db_err)?;
        tracing::debug!(post_id = ?saved.id, tags = saved.tag_ids.len(), "Post saved");

        Ok(saved)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        // Join rows go with the post through ON DELETE CASCADE.
        let result = PostEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_author(&self, user_id: i32) -> Result<Vec<PostRecord>, RepoError> {
        let models = PostEntity::find()
            .filter(post::Column::AuthorId.eq(user_id))
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        self.with_tags(models).await
    }

    async fn find_by_tag(&self, tag_id: i32) -> Result<Vec<PostRecord>, RepoError> {
        let post_ids: Vec<i32> = PostTagEntity::find()
            .filter(post_tag::Column::TagId.eq(tag_id))
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|link| link.post_id)
            .collect();
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = PostEntity::find()
            .filter(post::Column::Id.is_in(post_ids))
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        self.with_tags(models).await
    }
}

/// Writes the changes of one flush inside a single transaction.
///
/// The transaction rolls back when it is dropped before commit, so a
/// failing row leaves every earlier row of the set unwritten.
pub struct PostgresChangeWriter {
    db: DbConn,
}

impl PostgresChangeWriter {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChangeWriter for PostgresChangeWriter {
    async fn apply(&self, changes: ChangeSet) -> Result<SavedIds, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let mut saved = SavedIds::default();

        for record in changes.users {
            let model = user::ActiveModel::from(record)
                .save(&txn)
                .await
                .map_err(map_db_err)?
                .try_into_model()
                .map_err(|e| RepoError::Query(e.to_string()))?;
            saved.users.push(model.id);
        }
        for record in changes.tags {
            let model = tag::ActiveModel::from(record)
                .save(&txn)
                .await
                .map_err(map_db_err)?
                .try_into_model()
                .map_err(|e| RepoError::Query(e.to_string()))?;
            saved.tags.push(model.id);
        }
        for change in changes.posts {
            let record = change.resolve(&saved.users, &saved.tags)?;
            let post = write_post(&txn, record).await?;
            saved.posts.push(
                post.id
                    .ok_or_else(|| RepoError::Query("saved post has no ID".to_string()))?,
            );
        }

        txn.commit().await.map_err(map_db_err)?;
        tracing::debug!(
            users = saved.users.len(),
            tags = saved.tags.len(),
            posts = saved.posts.len(),
            "Changes committed"
        );

        Ok(saved)
    }
}
