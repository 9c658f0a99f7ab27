//! Lookups the engine needs from the outside world.
//!
//! Implementations live in infra (in-memory stores, caches); the engine only
//! sees these traits.

use std::sync::Arc;

use orgguard_core::{DomainResult, RoleId, UserId};

use crate::roles::Role;

/// Identity/session lookup: which role does a user act under?
pub trait IdentitySource: Send + Sync {
    fn role_id_of(&self, user_id: &UserId) -> Option<RoleId>;
}

/// Read side of the role store.
pub trait RoleSource: Send + Sync {
    fn role(&self, role_id: &RoleId) -> Option<Arc<Role>>;
}

/// Role store with writes (administration side).
pub trait RoleStore: RoleSource {
    /// Insert or replace a role. Implementations must validate it first.
    fn save(&self, role: Role) -> DomainResult<()>;

    fn delete(&self, role_id: &RoleId) -> DomainResult<()>;
}

impl<S> IdentitySource for Arc<S>
where
    S: IdentitySource + ?Sized,
{
    fn role_id_of(&self, user_id: &UserId) -> Option<RoleId> {
        (**self).role_id_of(user_id)
    }
}

impl<S> RoleSource for Arc<S>
where
    S: RoleSource + ?Sized,
{
    fn role(&self, role_id: &RoleId) -> Option<Arc<Role>> {
        (**self).role(role_id)
    }
}

impl<S> RoleStore for Arc<S>
where
    S: RoleStore + ?Sized,
{
    fn save(&self, role: Role) -> DomainResult<()> {
        (**self).save(role)
    }

    fn delete(&self, role_id: &RoleId) -> DomainResult<()> {
        (**self).delete(role_id)
    }
}
