//! `orgguard-core` — shared domain building blocks.
//!
//! Identifiers and the domain error model. No IO, no framework types.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{OuId, RoleId, UserId};
