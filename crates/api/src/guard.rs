//! Route-level authorization.
//!
//! Each guarded route declares a [`RequiredPermission`]. The guard loads the
//! principal's role at most once per request and runs the decision engine
//! against it.

use std::sync::Arc;

use orgguard_auth::{AuthorizationEngine, Flag, Grant, Role, evaluate, is_unguarded};

use crate::context::PrincipalContext;
use crate::errors::GuardError;

/// `(unit, flag)` metadata attached to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredPermission {
    pub unit: String,
    pub flag: Option<Flag>,
}

impl RequiredPermission {
    pub fn new(unit: impl Into<String>, flag: Flag) -> Self {
        Self {
            unit: unit.into(),
            flag: Some(flag),
        }
    }

    /// Build from the string form used in route tables (`"c"`, `"read"`, `""`).
    pub fn parse(unit: impl Into<String>, flag: &str) -> Self {
        Self {
            unit: unit.into(),
            flag: Flag::parse(flag),
        }
    }

    pub fn unguarded() -> Self {
        Self {
            unit: String::new(),
            flag: None,
        }
    }

    pub fn is_unguarded(&self) -> bool {
        is_unguarded(&self.unit, self.flag)
    }
}

/// The principal's role, memoized in request extensions after the first
/// guard on the request loads it.
#[derive(Debug, Clone)]
pub struct ResolvedRole(pub Arc<Role>);

#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    engine: Arc<AuthorizationEngine>,
}

impl AuthorizationGuard {
    pub fn new(engine: Arc<AuthorizationEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &AuthorizationEngine {
        &self.engine
    }

    /// Decide one request.
    ///
    /// `resolved` is the per-request role memo: used if present, filled in
    /// otherwise. Unguarded routes pass without a principal.
    pub fn check(
        &self,
        required: &RequiredPermission,
        principal: Option<&PrincipalContext>,
        resolved: &mut Option<ResolvedRole>,
    ) -> Result<Grant, GuardError> {
        if required.is_unguarded() {
            return Ok(Grant::Unguarded);
        }

        let principal = principal.ok_or(GuardError::Unauthenticated)?;
        let role = match resolved {
            Some(ResolvedRole(role)) => Arc::clone(role),
            None => {
                let role = self.engine.resolve_role(&principal.user_id())?;
                *resolved = Some(ResolvedRole(Arc::clone(&role)));
                role
            }
        };

        match evaluate(&role, &required.unit, required.flag) {
            Ok(grant) => Ok(grant),
            Err(e) => {
                tracing::info!(
                    user = %principal.user_id(),
                    role = %role.id,
                    unit = %required.unit,
                    error = %e,
                    "request denied"
                );
                Err(e.into())
            }
        }
    }
}
