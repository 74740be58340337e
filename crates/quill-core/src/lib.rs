//! # Quill Core
//!
//! The domain layer of the Quill blogging service.
//! Entities, their constraints and relationship bookkeeping live here,
//! together with the ports that infrastructure implements. No I/O.

pub mod domain;
pub mod error;
pub mod ports;
pub mod unit_of_work;

pub use error::DomainError;
pub use unit_of_work::UnitOfWork;
