//! # Quill Shared
//!
//! Wire types of the Quill REST API, usable by the server and by clients.

pub mod dto;
pub mod iri;
pub mod response;

pub use iri::ResourceRef;
pub use response::ErrorResponse;
