//! Batched writes for one flush of a unit of work.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{PostRecord, TagRecord, UserRecord};
use crate::error::RepoError;

/// Link from a post to a user or tag that may not have a row yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    /// The row already exists with this ID.
    Stored(i32),
    /// Index into the `users` or `tags` of the same [`ChangeSet`].
    Pending(usize),
}

impl EntityRef {
    fn resolve(self, saved: &[i32]) -> Result<i32, RepoError> {
        match self {
            EntityRef::Stored(id) => Ok(id),
            EntityRef::Pending(index) => saved.get(index).copied().ok_or_else(|| {
                RepoError::Query(format!("pending entity {index} has not been written"))
            }),
        }
    }
}

/// A post to insert or update, with its author and tags by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChange {
    pub id: Option<i32>,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub author: EntityRef,
    pub tags: Vec<EntityRef>,
}

impl PostChange {
    /// Storage shape, once the pending users and tags have their IDs.
    pub fn resolve(&self, user_ids: &[i32], tag_ids: &[i32]) -> Result<PostRecord, RepoError> {
        let mut tags = self
            .tags
            .iter()
            .map(|tag| tag.resolve(tag_ids))
            .collect::<Result<Vec<_>, _>>()?;
        tags.sort_unstable();
        tags.dedup();

        Ok(PostRecord {
            id: self.id,
            title: self.title.clone(),
            text: self.text.clone(),
            created_at: self.created_at,
            scheduled_at: self.scheduled_at,
            author_id: self.author.resolve(user_ids)?,
            tag_ids: tags,
        })
    }
}

/// Rows written by one flush. Only new or modified entities are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub users: Vec<UserRecord>,
    pub tags: Vec<TagRecord>,
    pub posts: Vec<PostChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.tags.is_empty() && self.posts.is_empty()
    }
}

/// IDs of the written rows, in [`ChangeSet`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedIds {
    pub users: Vec<i32>,
    pub tags: Vec<i32>,
    pub posts: Vec<i32>,
}

/// Writes a [`ChangeSet`] as a single transaction.
#[async_trait]
pub trait ChangeWriter: Send + Sync {
    /// Write users, then tags, then posts with their join rows.
    ///
    /// Either every row is written or none is.
    async fn apply(&self, changes: ChangeSet) -> Result<SavedIds, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(author: EntityRef, tags: Vec<EntityRef>) -> PostChange {
        PostChange {
            id: None,
            title: "Title".to_string(),
            text: "Text".to_string(),
            created_at: Utc::now(),
            scheduled_at: None,
            author,
            tags,
        }
    }

    #[test]
    fn test_resolve_mixes_stored_and_pending() {
        let post = change(
            EntityRef::Pending(1),
            vec![EntityRef::Pending(0), EntityRef::Stored(3), EntityRef::Stored(3)],
        );

        let record = post.resolve(&[10, 11], &[7]).unwrap();

        assert_eq!(record.author_id, 11);
        assert_eq!(record.tag_ids, vec![3, 7]);
    }

    #[test]
    fn test_resolve_unwritten_reference() {
        let post = change(EntityRef::Pending(0), vec![]);
        assert!(matches!(post.resolve(&[], &[]), Err(RepoError::Query(_))));
    }
}
