use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use orgguard_core::{RoleId, UserId};

use crate::permissions::{check_flag, Flag, PermissionNode};
use crate::roles::{NodeMatch, Role};
use crate::source::{IdentitySource, RoleSource};

/// Why a request was let through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grant {
    /// No unit/flag was declared: the operation is public.
    Unguarded,
    /// A permission node granted the flag.
    Node {
        unit: String,
        /// Top-level node the granting child hangs under, if any.
        parent: Option<String>,
        /// The caller must additionally scope the operation to an OU.
        ou_required: bool,
        tag_required: bool,
    },
}

/// Every variant is a deny. None of them abort the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: no permission '{unit}' with flag '{flag}'")]
    Forbidden { unit: String, flag: Flag },

    #[error("user {0} has no role")]
    UserNotFound(UserId),

    #[error("role {0} not found")]
    RoleNotFound(RoleId),

    #[error("role {0} is inactive")]
    RoleInactive(RoleId),
}

/// Outcome of evaluating one name-matched node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome {
    Granted,
    FlagDenied,
    /// The node has no usable gate.
    Malformed,
}

fn node_outcome(node: &PermissionNode, flag: Flag) -> NodeOutcome {
    match &node.option {
        Some(option) if check_flag(flag, option) => NodeOutcome::Granted,
        Some(_) => NodeOutcome::FlagDenied,
        None => {
            tracing::warn!(permission = %node.name, "permission node has no option; treating as deny");
            NodeOutcome::Malformed
        }
    }
}

fn grant_for(m: &NodeMatch<'_>) -> Grant {
    Grant::Node {
        unit: m.node.name.clone(),
        parent: m.parent.map(|p| p.name.clone()),
        ou_required: m.node.ou_required,
        tag_required: m.node.tag_required,
    }
}

/// Is this a public operation (no unit or no flag declared)?
pub fn is_unguarded(unit: &str, flag: Option<Flag>) -> bool {
    unit.is_empty() || flag.is_none()
}

/// Decide whether `role` grants `flag` on `unit`.
///
/// Exhaustive ordered scan over the two-level tree: a node whose name matches
/// but whose gate refuses the flag does not end the search, since the same
/// unit may be granted by a later node.
///
/// - No IO
/// - No panics
pub fn evaluate(role: &Role, unit: &str, flag: Option<Flag>) -> Result<Grant, AuthzError> {
    let Some(flag) = flag.filter(|_| !unit.is_empty()) else {
        return Ok(Grant::Unguarded);
    };

    if !role.active {
        return Err(AuthzError::RoleInactive(role.id));
    }

    role.find_nodes(unit)
        .find(|m| node_outcome(m.node, flag) == NodeOutcome::Granted)
        .map(|m| grant_for(&m))
        .ok_or_else(|| AuthzError::Forbidden {
            unit: unit.to_string(),
            flag,
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Resolves `(unit, flag, user)` to a decision via the user's role.
#[derive(Clone)]
pub struct AuthorizationEngine {
    identities: Arc<dyn IdentitySource>,
    roles: Arc<dyn RoleSource>,
}

impl AuthorizationEngine {
    pub fn new(identities: Arc<dyn IdentitySource>, roles: Arc<dyn RoleSource>) -> Self {
        Self { identities, roles }
    }

    /// Load the role a user acts under.
    pub fn resolve_role(&self, user_id: &UserId) -> Result<Arc<Role>, AuthzError> {
        let Some(role_id) = self.identities.role_id_of(user_id) else {
            tracing::warn!(user = %user_id, "no role assigned; denying");
            return Err(AuthzError::UserNotFound(*user_id));
        };
        self.roles.role(&role_id).ok_or_else(|| {
            tracing::warn!(user = %user_id, role = %role_id, "role not found; denying");
            AuthzError::RoleNotFound(role_id)
        })
    }

    /// Typed decision for `user_id`.
    ///
    /// Unguarded operations are allowed without touching the role store.
    pub fn check(&self, unit: &str, flag: Option<Flag>, user_id: &UserId) -> Result<Grant, AuthzError> {
        if is_unguarded(unit, flag) {
            return Ok(Grant::Unguarded);
        }
        let role = self.resolve_role(user_id)?;
        evaluate(&role, unit, flag)
    }

    /// `Authorize(unit, flag, userId) -> bool`.
    pub fn authorize(&self, unit: &str, flag: Option<Flag>, user_id: &UserId) -> bool {
        match self.check(unit, flag, user_id) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(user = %user_id, unit, error = %e, "authorization denied");
                false
            }
        }
    }

    /// Audit view of the decision for `user_id`.
    pub fn explain(
        &self,
        unit: &str,
        flag: Option<Flag>,
        user_id: &UserId,
    ) -> Result<AuthorizationExplanation, AuthzError> {
        if is_unguarded(unit, flag) {
            return Ok(AuthorizationExplanation::unguarded(unit, flag));
        }
        let role = self.resolve_role(user_id)?;
        Ok(explain_authorization(&role, unit, flag))
    }
}

impl core::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthorizationEngine").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub unit: String,
    pub flag: Option<Flag>,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// `None` when the operation is public and no role was consulted.
    pub role: Option<RoleSummary>,
    /// Every node named `unit` that was evaluated, in scan order, up to and
    /// including the one that granted.
    pub inspected: Vec<InspectedNode>,
    pub evaluated_at: DateTime<Utc>,
}

impl AuthorizationExplanation {
    fn unguarded(unit: &str, flag: Option<Flag>) -> Self {
        Self {
            unit: unit.to_string(),
            flag,
            granted: true,
            reason: "operation declares no unit/flag; it is public".to_string(),
            role: None,
            inspected: Vec::new(),
            evaluated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleSummary {
    pub id: RoleId,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectedNode {
    pub name: String,
    pub parent: Option<String>,
    pub outcome: NodeOutcome,
}

/// Explain why `role` does or does not grant `flag` on `unit`.
///
/// Walks the same nodes in the same order as [`evaluate`] and always agrees
/// with it.
pub fn explain_authorization(role: &Role, unit: &str, flag: Option<Flag>) -> AuthorizationExplanation {
    let summary = RoleSummary {
        id: role.id,
        name: role.name.clone(),
        active: role.active,
    };
    let explanation = |granted: bool, reason: String, inspected: Vec<InspectedNode>| {
        AuthorizationExplanation {
            unit: unit.to_string(),
            flag,
            granted,
            reason,
            role: Some(summary.clone()),
            inspected,
            evaluated_at: Utc::now(),
        }
    };

    let Some(flag) = flag.filter(|_| !unit.is_empty()) else {
        return AuthorizationExplanation {
            role: Some(summary.clone()),
            ..AuthorizationExplanation::unguarded(unit, flag)
        };
    };

    if !role.active {
        return explanation(false, format!("role '{}' is inactive", role.name), Vec::new());
    }

    let mut inspected = Vec::new();
    for m in role.find_nodes(unit) {
        let outcome = node_outcome(m.node, flag);
        inspected.push(InspectedNode {
            name: m.node.name.clone(),
            parent: m.parent.map(|p| p.name.clone()),
            outcome,
        });
        if outcome == NodeOutcome::Granted {
            let via = match m.parent {
                Some(parent) => format!("child of '{}'", parent.name),
                None => "top-level node".to_string(),
            };
            return explanation(true, format!("'{unit}' grants '{flag}' ({via})"), inspected);
        }
    }

    let reason = if inspected.is_empty() {
        format!("role '{}' has no permission named '{unit}'", role.name)
    } else {
        format!(
            "{} node(s) named '{unit}' found, none grants '{flag}'",
            inspected.len()
        )
    };
    explanation(false, reason, inspected)
}

/// Flattened view of one node's grants, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveGrant {
    pub unit: String,
    pub parent: Option<String>,
    pub flags: Vec<Flag>,
    pub ou_required: bool,
    pub tag_required: bool,
}

/// Every node of an active role that grants at least one flag, in scan order.
pub fn effective_grants(role: &Role) -> Vec<EffectiveGrant> {
    if !role.active {
        return Vec::new();
    }

    let grant = |node: &PermissionNode, parent: Option<&PermissionNode>| EffectiveGrant {
        unit: node.name.clone(),
        parent: parent.map(|p| p.name.clone()),
        flags: node.granted_flags(),
        ou_required: node.ou_required,
        tag_required: node.tag_required,
    };

    role.permissions
        .iter()
        .flat_map(|top| {
            std::iter::once(grant(top, None))
                .chain(top.children.iter().map(move |child| grant(child, Some(top))))
        })
        .filter(|g| !g.flags.is_empty())
        .collect()
}
