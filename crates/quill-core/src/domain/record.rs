//! Flat, storage-shaped snapshots of the entities.
//!
//! Repositories read and write these. An `id` of `None` means the row has
//! not been inserted yet; saving it assigns one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Option<i32>,
    pub email: String,
    pub roles: Vec<String>,
    /// Password hash.
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: Option<i32>,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub author_id: i32,
    /// Owning side of the post/tag association.
    pub tag_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: Option<i32>,
    pub label: String,
}
