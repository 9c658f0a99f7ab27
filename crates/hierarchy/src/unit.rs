use serde::{Deserialize, Serialize};

use orgguard_core::OuId;

/// A node of the organizational forest.
///
/// `parent == None` marks a root. The parent is stored as an id and resolved
/// through the store on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalUnit {
    pub id: OuId,
    pub name: String,
    #[serde(default)]
    pub parent: Option<OuId>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(rename = "type", default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl OrganizationalUnit {
    /// Active root unit with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: OuId::new(),
            name: name.into(),
            parent: None,
            category: None,
            unit_type: None,
            location: None,
            active: true,
        }
    }

    pub fn with_id(mut self, id: OuId) -> Self {
        self.id = id;
        self
    }

    pub fn with_parent(mut self, parent: OuId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_type(mut self, unit_type: impl Into<String>) -> Self {
        self.unit_type = Some(unit_type.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
