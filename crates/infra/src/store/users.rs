use std::collections::HashMap;
use std::sync::RwLock;

use orgguard_auth::IdentitySource;
use orgguard_core::{RoleId, UserId};

/// User → role assignments. A user acts under exactly one role.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    inner: RwLock<HashMap<UserId, RoleId>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign (or replace) the user's role.
    pub fn assign(&self, user_id: UserId, role_id: RoleId) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(user_id, role_id);
        }
    }

    pub fn unassign(&self, user_id: &UserId) {
        if let Ok(mut map) = self.inner.write() {
            map.remove(user_id);
        }
    }

    /// Users currently acting under `role_id`.
    pub fn members_of(&self, role_id: &RoleId) -> Vec<UserId> {
        match self.inner.read() {
            Ok(map) => map
                .iter()
                .filter_map(|(user, role)| (role == role_id).then_some(*user))
                .collect(),
            Err(_) => vec![],
        }
    }
}

impl IdentitySource for InMemoryUserDirectory {
    fn role_id_of(&self, user_id: &UserId) -> Option<RoleId> {
        let map = self.inner.read().ok()?;
        map.get(user_id).copied()
    }
}
