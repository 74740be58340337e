//! In-memory repositories - used when no database is configured.
//!
//! The three repositories share one set of tables so that the relational
//! rules of the real schema still hold: unique emails, a post needs an
//! existing author and existing tags, a user with posts cannot be deleted,
//! and deleting a post or tag drops its join rows.
//! Note: Data is lost on process restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use quill_core::domain::{PostRecord, TagRecord, UserRecord};
use quill_core::error::RepoError;
use quill_core::ports::{
    BaseRepository, ChangeSet, ChangeWriter, PostRepository, SavedIds, TagRepository,
    UserRepository,
};

use super::mask_email;

#[derive(Clone, Default)]
struct Tables {
    users: BTreeMap<i32, UserRecord>,
    posts: BTreeMap<i32, PostRecord>,
    tags: BTreeMap<i32, TagRecord>,
    last_user_id: i32,
    last_post_id: i32,
    last_tag_id: i32,
}

impl Tables {
    fn save_user(&mut self, mut entity: UserRecord) -> Result<UserRecord, RepoError> {
        let taken = self
            .users
            .values()
            .any(|u| u.email == entity.email && u.id != entity.id);
        if taken {
            tracing::debug!(user_email = %mask_email(&entity.email), "Duplicate email rejected");
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }

        let id = match entity.id {
            Some(id) if self.users.contains_key(&id) => id,
            Some(_) => return Err(RepoError::NotFound),
            None => {
                self.last_user_id += 1;
                self.last_user_id
            }
        };
        entity.id = Some(id);
        self.users.insert(id, entity.clone());
        Ok(entity)
    }

    fn save_tag(&mut self, mut entity: TagRecord) -> Result<TagRecord, RepoError> {
        let id = match entity.id {
            Some(id) if self.tags.contains_key(&id) => id,
            Some(_) => return Err(RepoError::NotFound),
            None => {
                self.last_tag_id += 1;
                self.last_tag_id
            }
        };
        entity.id = Some(id);
        self.tags.insert(id, entity.clone());
        Ok(entity)
    }

    fn save_post(&mut self, mut entity: PostRecord) -> Result<PostRecord, RepoError> {
        if !self.users.contains_key(&entity.author_id) {
            return Err(RepoError::Constraint(format!(
                "Author {} does not exist",
                entity.author_id
            )));
        }
        if let Some(missing) = entity.tag_ids.iter().find(|id| !self.tags.contains_key(id)) {
            return Err(RepoError::Constraint(format!("Tag {missing} does not exist")));
        }

        let id = match entity.id {
            Some(id) if self.posts.contains_key(&id) => id,
            Some(_) => return Err(RepoError::NotFound),
            None => {
                self.last_post_id += 1;
                self.last_post_id
            }
        };
        entity.id = Some(id);
        entity.tag_ids.sort_unstable();
        entity.tag_ids.dedup();
        self.posts.insert(id, entity.clone());
        Ok(entity)
    }

    fn apply(&mut self, changes: ChangeSet) -> Result<SavedIds, RepoError> {
        let mut saved = SavedIds::default();
        for user in changes.users {
            saved.users.push(id_of(self.save_user(user)?.id)?);
        }
        for tag in changes.tags {
            saved.tags.push(id_of(self.save_tag(tag)?.id)?);
        }
        for post in changes.posts {
            let record = post.resolve(&saved.users, &saved.tags)?;
            saved.posts.push(id_of(self.save_post(record)?.id)?);
        }
        Ok(saved)
    }
}

fn id_of(id: Option<i32>) -> Result<i32, RepoError> {
    id.ok_or_else(|| RepoError::Query("saved row has no ID".to_string()))
}

/// Shared in-memory storage handing out the three repositories.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository { db: self.clone() }
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository { db: self.clone() }
    }

    pub fn tags(&self) -> InMemoryTagRepository {
        InMemoryTagRepository { db: self.clone() }
    }
}

/// Applies a change set to a copy of the tables and swaps it in only when
/// every row was accepted.
#[async_trait]
impl ChangeWriter for InMemoryDatabase {
    async fn apply(&self, changes: ChangeSet) -> Result<SavedIds, RepoError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let saved = staged.apply(changes)?;
        *tables = staged;
        Ok(saved)
    }
}

pub struct InMemoryUserRepository {
    db: InMemoryDatabase,
}

pub struct InMemoryPostRepository {
    db: InMemoryDatabase,
}

pub struct InMemoryTagRepository {
    db: InMemoryDatabase,
}

#[async_trait]
impl BaseRepository<UserRecord, i32> for InMemoryUserRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.db.tables.read().await.users.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>, RepoError> {
        Ok(self.db.tables.read().await.users.values().cloned().collect())
    }

    async fn save(&self, entity: UserRecord) -> Result<UserRecord, RepoError> {
        self.db.tables.write().await.save_user(entity)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.db.tables.write().await;
        if tables.posts.values().any(|p| p.author_id == id) {
            return Err(RepoError::Constraint(format!(
                "User {id} is still referenced by posts"
            )));
        }
        tables.users.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");
        Ok(self
            .db
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl BaseRepository<PostRecord, i32> for InMemoryPostRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.db.tables.read().await.posts.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self.db.tables.read().await.posts.values().cloned().collect())
    }

    async fn save(&self, entity: PostRecord) -> Result<PostRecord, RepoError> {
        self.db.tables.write().await.save_post(entity)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.db.tables.write().await;
        tables.posts.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_by_author(&self, user_id: i32) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables
            .posts
            .values()
            .filter(|p| p.author_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_tag(&self, tag_id: i32) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables
            .posts
            .values()
            .filter(|p| p.tag_ids.contains(&tag_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<TagRecord, i32> for InMemoryTagRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<TagRecord>, RepoError> {
        Ok(self.db.tables.read().await.tags.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<TagRecord>, RepoError> {
        Ok(self.db.tables.read().await.tags.values().cloned().collect())
    }

    async fn save(&self, entity: TagRecord) -> Result<TagRecord, RepoError> {
        self.db.tables.write().await.save_tag(entity)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.db.tables.write().await;
        tables.tags.remove(&id).ok_or(RepoError::NotFound)?;
        for post in tables.posts.values_mut() {
            post.tag_ids.retain(|t| *t != id);
        }
        Ok(())
    }
}

#[async_trait]
impl TagRepository for InMemoryTagRepository {
    async fn find_many(&self, ids: &[i32]) -> Result<Vec<TagRecord>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables
            .tags
            .values()
            .filter(|t| t.id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }
}
