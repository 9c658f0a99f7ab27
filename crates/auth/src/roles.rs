use serde::{Deserialize, Serialize};

use orgguard_core::{DomainError, DomainResult, RoleId};

use crate::permissions::PermissionNode;

/// A role document: the sole source of truth for what its users may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<PermissionNode>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A node whose name matched a lookup, with the top-level node it hangs
/// under (`None` for top-level matches).
#[derive(Debug, Clone, Copy)]
pub struct NodeMatch<'a> {
    pub node: &'a PermissionNode,
    pub parent: Option<&'a PermissionNode>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RoleId::new(),
            name: name.into(),
            permissions: Vec::new(),
            active: true,
        }
    }

    pub fn with_id(mut self, id: RoleId) -> Self {
        self.id = id;
        self
    }

    pub fn with_permissions(mut self, permissions: Vec<PermissionNode>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Structural checks run before a role is persisted.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("role name cannot be empty"));
        }
        for top in &self.permissions {
            if top.name.trim().is_empty() {
                return Err(DomainError::validation("permission name cannot be empty"));
            }
            for child in &top.children {
                if child.name.trim().is_empty() {
                    return Err(DomainError::validation(format!(
                        "child permission under '{}' has an empty name",
                        top.name
                    )));
                }
                if !child.children.is_empty() {
                    return Err(DomainError::validation(format!(
                        "permission '{}' under '{}' nests deeper than two levels",
                        child.name, top.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every node named `unit`, in scan order: each top-level node, then its
    /// children, before moving to the next top-level node.
    ///
    /// Names are not unique; all matches are yielded. Anything nested below
    /// the second level is ignored.
    pub fn find_nodes<'a>(&'a self, unit: &'a str) -> impl Iterator<Item = NodeMatch<'a>> + 'a {
        self.permissions
            .iter()
            .flat_map(|top| {
                std::iter::once(NodeMatch {
                    node: top,
                    parent: None,
                })
                .chain(top.children.iter().map(move |child| NodeMatch {
                    node: child,
                    parent: Some(top),
                }))
            })
            .filter(move |m| m.node.name == unit)
    }
}
