use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use orgguard_auth::{Role, RoleSource, RoleStore};
use orgguard_core::{DomainError, DomainResult, RoleId};

/// In-memory role documents keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    inner: RwLock<HashMap<RoleId, Arc<Role>>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<Arc<Role>> {
        match self.inner.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }
}

impl RoleSource for InMemoryRoleStore {
    fn role(&self, role_id: &RoleId) -> Option<Arc<Role>> {
        let map = self.inner.read().ok()?;
        map.get(role_id).cloned()
    }
}

impl RoleStore for InMemoryRoleStore {
    fn save(&self, role: Role) -> DomainResult<()> {
        role.validate()?;
        let mut map = self
            .inner
            .write()
            .map_err(|_| DomainError::invariant("role store lock poisoned"))?;
        map.insert(role.id, Arc::new(role));
        Ok(())
    }

    fn delete(&self, role_id: &RoleId) -> DomainResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| DomainError::invariant("role store lock poisoned"))?;
        map.remove(role_id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("role {role_id}")))
    }
}
