//! Resource references: how one entity points at another in JSON bodies.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const API_PREFIX: &str = "/api";
pub const USERS: &str = "users";
pub const POSTS: &str = "posts";
pub const TAGS: &str = "tags";

/// IRI of an item, e.g. `/api/tags/3`.
pub fn iri(collection: &str, id: i32) -> String {
    format!("{API_PREFIX}/{collection}/{id}")
}

/// Reference to another resource in a request body.
///
/// Accepts a bare integer id, a numeric string, or an IRI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ResourceRef {
    Id(i32),
    #[schema(example = "/api/users/1")]
    Iri(String),
}

impl ResourceRef {
    /// Resolve to an id within `collection`.
    pub fn id_in(&self, collection: &str) -> Result<i32, String> {
        match self {
            ResourceRef::Id(id) => Ok(*id),
            ResourceRef::Iri(value) => {
                let prefix = format!("{API_PREFIX}/{collection}/");
                value
                    .strip_prefix(prefix.as_str())
                    .unwrap_or(value)
                    .parse()
                    .map_err(|_| format!("Invalid IRI \"{value}\" for {collection}."))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iri() {
        assert_eq!(iri(TAGS, 3), "/api/tags/3");
    }

    #[test]
    fn test_resolve_forms() {
        let refs: Vec<ResourceRef> = serde_json::from_str(r#"[1, "2", "/api/users/3"]"#).unwrap();
        let ids: Vec<i32> = refs.iter().map(|r| r.id_in(USERS).unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_wrong_collection() {
        let r = ResourceRef::Iri("/api/tags/3".to_string());
        assert!(r.id_in(USERS).is_err());
    }
}
