//! Domain entities - the core business objects.
//!
//! Entities never point at each other directly. Links between them are
//! typed keys handed out by an [`EntityGraph`], which is also the only
//! place where associations can be changed.

mod graph;
mod post;
mod record;
mod tag;
mod user;
mod validation;

pub use graph::{EntityGraph, PostKey, TagKey, UserKey};
pub use post::Post;
pub use record::{PostRecord, TagRecord, UserRecord};
pub use tag::Tag;
pub use user::{BASE_ROLE, User};
pub use validation::{ValidationContext, not_blank};
