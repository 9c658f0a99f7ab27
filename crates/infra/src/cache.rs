//! Read-through caches for the two hot lookups: role-by-id and
//! OU-parent-by-id.
//!
//! Both wrap a store and are invalidated write-through when the write goes
//! through the wrapper. Writes that bypass it (another process, a direct
//! store handle) must call `invalidate`/`invalidate_all`, or wait out the TTL.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;

use orgguard_auth::{Role, RoleSource, RoleStore};
use orgguard_core::{DomainResult, OuId, RoleId};
use orgguard_hierarchy::{HierarchyError, OrganizationalUnit, OuGraph, OuStore};

/// Capacity and TTL bounds for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_capacity: u64,
    pub ttl: Duration,
}

/// A moka cache plus a write generation.
///
/// A load that overlaps an invalidation never leaves its value behind: the
/// loader re-checks the generation after inserting and drops its own entry if
/// a write went past in the meantime. Misses are not cached.
struct ReadThrough<K, V> {
    cache: Cache<K, V>,
    generation: AtomicU64,
}

impl<K, V> ReadThrough<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn new(config: CacheConfig) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.ttl)
                .build(),
            generation: AtomicU64::new(0),
        }
    }

    fn get_or_load(&self, key: &K, load: impl FnOnce() -> Option<V>) -> Option<V> {
        if let Some(hit) = self.cache.get(key) {
            return Some(hit);
        }
        let seen = self.generation.load(Ordering::SeqCst);
        let value = load()?;
        self.cache.insert(key.clone(), value.clone());
        if self.generation.load(Ordering::SeqCst) != seen {
            self.cache.invalidate(key);
        }
        Some(value)
    }

    /// Call after the backing write has committed.
    fn invalidate(&self, key: &K) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(key);
    }

    fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

pub struct CachedRoleStore<S> {
    inner: S,
    cache: ReadThrough<RoleId, Arc<Role>>,
}

impl<S> CachedRoleStore<S> {
    pub fn new(inner: S, config: CacheConfig) -> Self {
        Self {
            inner,
            cache: ReadThrough::new(config),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn invalidate(&self, role_id: &RoleId) {
        self.cache.invalidate(role_id);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl<S> RoleSource for CachedRoleStore<S>
where
    S: RoleSource,
{
    fn role(&self, role_id: &RoleId) -> Option<Arc<Role>> {
        self.cache.get_or_load(role_id, || self.inner.role(role_id))
    }
}

impl<S> RoleStore for CachedRoleStore<S>
where
    S: RoleStore,
{
    fn save(&self, role: Role) -> DomainResult<()> {
        let id = role.id;
        self.inner.save(role)?;
        self.invalidate(&id);
        tracing::debug!(role = %id, "role saved; cache entry invalidated");
        Ok(())
    }

    fn delete(&self, role_id: &RoleId) -> DomainResult<()> {
        self.inner.delete(role_id)?;
        self.invalidate(role_id);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Organizational units
// ─────────────────────────────────────────────────────────────────────────────

/// Caches the parent link of each unit; everything else passes through.
pub struct CachedOuStore<S> {
    inner: S,
    parents: ReadThrough<OuId, Option<OuId>>,
}

impl<S> CachedOuStore<S> {
    pub fn new(inner: S, config: CacheConfig) -> Self {
        Self {
            inner,
            parents: ReadThrough::new(config),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn invalidate(&self, id: &OuId) {
        self.parents.invalidate(id);
    }

    pub fn invalidate_all(&self) {
        self.parents.invalidate_all();
    }
}

impl<S> OuGraph for CachedOuStore<S>
where
    S: OuGraph + Send + Sync,
{
    fn parent_of(&self, id: &OuId) -> Option<Option<OuId>> {
        self.parents.get_or_load(id, || self.inner.parent_of(id))
    }

    fn children_of(&self, id: &OuId) -> Vec<OuId> {
        self.inner.children_of(id)
    }
}

impl<S> OuStore for CachedOuStore<S>
where
    S: OuStore,
{
    fn get(&self, id: &OuId) -> Option<OrganizationalUnit> {
        self.inner.get(id)
    }

    fn list(&self) -> Vec<OrganizationalUnit> {
        self.inner.list()
    }

    fn insert(
        &self,
        unit: OrganizationalUnit,
        validate: &dyn Fn(&dyn OuGraph) -> Result<(), HierarchyError>,
    ) -> Result<(), HierarchyError> {
        let id = unit.id;
        self.inner.insert(unit, validate)?;
        self.invalidate(&id);
        Ok(())
    }

    fn set_active(&self, id: &OuId, active: bool) -> Result<(), HierarchyError> {
        self.inner.set_active(id, active)
    }

    fn update_parent(
        &self,
        id: &OuId,
        new_parent: Option<OuId>,
        validate: &dyn Fn(&dyn OuGraph) -> Result<(), HierarchyError>,
    ) -> Result<(), HierarchyError> {
        // Validation sees the backing store under its own lock, never the cache.
        // Invalidating only after the commit is enough: a parent read that
        // raced the commit is dropped by the generation check.
        let result = self.inner.update_parent(id, new_parent, validate);
        self.invalidate(id);
        result
    }
}
