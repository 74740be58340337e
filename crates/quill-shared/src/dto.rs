//! Data Transfer Objects - request/response types for the API.
//!
//! Field descriptions and examples feed the generated OpenAPI document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::iri::ResourceRef;

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// --- users ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// Unique identifier of the user.
    #[schema(example = 1)]
    pub id: i32,
    /// Email address of the user, used as unique identifier.
    #[schema(example = "test@mail.test")]
    pub email: String,
    /// Roles assigned to the user.
    #[schema(example = json!(["ROLE_USER", "ROLE_ADMIN"]))]
    pub roles: Vec<String>,
    /// Posts authored by the user.
    #[schema(example = json!([]))]
    pub posts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "test@mail.test")]
    pub email: String,
    /// Plain-text password; only its hash is stored.
    #[schema(example = "correct horse battery staple")]
    pub password: String,
    #[serde(default)]
    #[schema(example = json!(["ROLE_ADMIN"]))]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Vec<String>>,
}

// --- posts ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    /// Unique identifier of the post.
    #[schema(example = 1)]
    pub id: i32,
    /// Title of the post.
    #[schema(example = "My first post")]
    pub title: String,
    /// Text of the post.
    #[schema(example = "This is the content of my first post.")]
    pub text: String,
    /// Creation date of the post.
    #[schema(example = "2024-12-31T23:59:59+00:00")]
    pub created_at: DateTime<Utc>,
    /// Scheduled publication date of the post.
    #[schema(example = "2024-12-31T23:59:59+00:00")]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Author of the post.
    #[schema(example = "/api/users/1")]
    pub author: Option<String>,
    /// Tags associated with the post.
    #[schema(example = json!([]))]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[schema(example = "My first post")]
    pub title: String,
    #[schema(example = "This is the content of my first post.")]
    pub text: String,
    /// Required. Left out, it is reported as a constraint violation.
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    pub author: Option<ResourceRef>,
    #[serde(default)]
    pub tags: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub text: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// `null` clears the schedule.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    pub author: Option<ResourceRef>,
    pub tags: Option<Vec<ResourceRef>>,
}

// --- tags ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagResponse {
    /// Unique identifier of the tag.
    #[schema(example = 1)]
    pub id: i32,
    /// Label of the tag.
    #[schema(example = "Symfony")]
    pub label: String,
    /// Posts associated with the tag.
    #[schema(example = json!([]))]
    pub posts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    #[schema(example = "Rust")]
    pub label: String,
    #[serde(default)]
    pub posts: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTagRequest {
    pub label: Option<String>,
    pub posts: Option<Vec<ResourceRef>>,
}

// --- auth ---

/// Request to login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "test@mail.test")]
    pub email: String,
    pub password: String,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}
