//! `orgguard-auth` — permission trees and the authorization decision engine.
//!
//! This crate is intentionally decoupled from HTTP and storage: lookups come
//! in through the traits in [`source`].

pub mod authorize;
pub mod permissions;
pub mod roles;
pub mod source;

pub use authorize::{
    AuthorizationEngine, AuthorizationExplanation, AuthzError, EffectiveGrant, Grant, NodeOutcome,
    effective_grants, evaluate, explain_authorization, is_unguarded,
};
pub use permissions::{Flag, PermissionNode, PermissionOption, check_flag};
pub use roles::{NodeMatch, Role};
pub use source::{IdentitySource, RoleSource, RoleStore};
