//! HTTP edge: the authorization guard and its axum middleware.

pub mod context;
pub mod errors;
pub mod guard;
pub mod middleware;

pub use context::PrincipalContext;
pub use errors::{GuardError, json_error};
pub use guard::{AuthorizationGuard, RequiredPermission, ResolvedRole};
pub use middleware::{GuardedRoute, guard_middleware};
