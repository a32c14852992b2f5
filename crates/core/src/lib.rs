//! `warden-core` — identifiers and error primitives shared by every layer.
//!
//! No IO, no HTTP, no storage.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{UserId, UserUuid};
