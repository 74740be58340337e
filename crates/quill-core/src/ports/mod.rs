//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod change_set;
mod identity;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use change_set::{ChangeSet, ChangeWriter, EntityRef, PostChange, SavedIds};
pub use identity::{PasswordAuthenticated, UserIdentity};
pub use repository::{BaseRepository, PostRepository, TagRepository, UserRepository};
