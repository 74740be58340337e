use async_trait::async_trait;

use crate::domain::{PostRecord, TagRecord, UserRecord};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// All entities, ordered by ID.
    async fn find_all(&self) -> Result<Vec<T>, RepoError>;

    /// Save an entity. Inserts and assigns an ID when it has none yet.
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<UserRecord, i32> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;
}

/// Post repository.
///
/// Saving a post also replaces its rows in the post/tag join table.
#[async_trait]
pub trait PostRepository: BaseRepository<PostRecord, i32> {
    async fn find_by_author(&self, user_id: i32) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_by_tag(&self, tag_id: i32) -> Result<Vec<PostRecord>, RepoError>;
}

/// Tag repository.
#[async_trait]
pub trait TagRepository: BaseRepository<TagRecord, i32> {
    /// Tags with the given IDs; unknown IDs are skipped.
    async fn find_many(&self, ids: &[i32]) -> Result<Vec<TagRecord>, RepoError>;
}
