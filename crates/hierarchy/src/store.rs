//! Storage abstractions for the organizational forest.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use orgguard_core::OuId;

use crate::error::HierarchyError;
use crate::unit::OrganizationalUnit;

/// Read view of the parent relation, queried in both directions.
pub trait OuGraph {
    /// Parent of `id`: `None` if the unit is unknown, `Some(None)` for a root.
    fn parent_of(&self, id: &OuId) -> Option<Option<OuId>>;

    /// Direct children of `id`. Unknown ids have no children.
    fn children_of(&self, id: &OuId) -> Vec<OuId>;

    fn contains(&self, id: &OuId) -> bool {
        self.parent_of(id).is_some()
    }
}

/// Unit store backing [`crate::OuHierarchyService`].
pub trait OuStore: OuGraph + Send + Sync {
    fn get(&self, id: &OuId) -> Option<OrganizationalUnit>;

    fn list(&self) -> Vec<OrganizationalUnit>;

    /// Run `validate` against the current graph and, if it passes, insert
    /// `unit`. Its parent, if any, must already exist.
    fn insert(
        &self,
        unit: OrganizationalUnit,
        validate: &dyn Fn(&dyn OuGraph) -> Result<(), HierarchyError>,
    ) -> Result<(), HierarchyError>;

    fn set_active(&self, id: &OuId, active: bool) -> Result<(), HierarchyError>;

    /// Run `validate` against the current graph and, if it passes, set the
    /// parent of `id`. Both steps happen inside one critical section so no
    /// concurrent writer can slip a cycle in between.
    fn update_parent(
        &self,
        id: &OuId,
        new_parent: Option<OuId>,
        validate: &dyn Fn(&dyn OuGraph) -> Result<(), HierarchyError>,
    ) -> Result<(), HierarchyError>;
}

impl<G> OuGraph for Arc<G>
where
    G: OuGraph + ?Sized,
{
    fn parent_of(&self, id: &OuId) -> Option<Option<OuId>> {
        (**self).parent_of(id)
    }

    fn children_of(&self, id: &OuId) -> Vec<OuId> {
        (**self).children_of(id)
    }

    fn contains(&self, id: &OuId) -> bool {
        (**self).contains(id)
    }
}

impl<S> OuStore for Arc<S>
where
    S: OuStore + ?Sized,
{
    fn get(&self, id: &OuId) -> Option<OrganizationalUnit> {
        (**self).get(id)
    }

    fn list(&self) -> Vec<OrganizationalUnit> {
        (**self).list()
    }

    fn insert(
        &self,
        unit: OrganizationalUnit,
        validate: &dyn Fn(&dyn OuGraph) -> Result<(), HierarchyError>,
    ) -> Result<(), HierarchyError> {
        (**self).insert(unit, validate)
    }

    fn set_active(&self, id: &OuId, active: bool) -> Result<(), HierarchyError> {
        (**self).set_active(id, active)
    }

    fn update_parent(
        &self,
        id: &OuId,
        new_parent: Option<OuId>,
        validate: &dyn Fn(&dyn OuGraph) -> Result<(), HierarchyError>,
    ) -> Result<(), HierarchyError> {
        (**self).update_parent(id, new_parent, validate)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Arena
// ─────────────────────────────────────────────────────────────────────────────

/// Units indexed by id, plus an inverse (children) index.
///
/// The children index is kept in insertion order so closure queries are
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct OuArena {
    units: HashMap<OuId, OrganizationalUnit>,
    children: HashMap<OuId, Vec<OuId>>,
}

impl OuArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load persisted units as-is, in any order.
    ///
    /// No structural validation happens here: whatever the backing data says
    /// is what closure queries will see, including dangling parents or loops.
    pub fn from_units(units: impl IntoIterator<Item = OrganizationalUnit>) -> Self {
        let mut arena = Self::new();
        for unit in units {
            if let Some(parent) = unit.parent {
                arena.children.entry(parent).or_default().push(unit.id);
            }
            arena.units.insert(unit.id, unit);
        }
        arena
    }

    pub fn get(&self, id: &OuId) -> Option<&OrganizationalUnit> {
        self.units.get(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> impl Iterator<Item = &OrganizationalUnit> {
        self.units.values()
    }

    pub fn insert(&mut self, unit: OrganizationalUnit) -> Result<(), HierarchyError> {
        if self.units.contains_key(&unit.id) {
            return Err(HierarchyError::Duplicate(unit.id));
        }
        if let Some(parent) = unit.parent {
            if !self.units.contains_key(&parent) {
                return Err(HierarchyError::NotFound(parent));
            }
            self.children.entry(parent).or_default().push(unit.id);
        }
        self.units.insert(unit.id, unit);
        Ok(())
    }

    pub fn set_active(&mut self, id: &OuId, active: bool) -> Result<(), HierarchyError> {
        let unit = self
            .units
            .get_mut(id)
            .ok_or(HierarchyError::NotFound(*id))?;
        unit.active = active;
        Ok(())
    }

    /// Move `id` under `new_parent` without any cycle check.
    fn set_parent(&mut self, id: &OuId, new_parent: Option<OuId>) -> Result<(), HierarchyError> {
        let unit = self
            .units
            .get_mut(id)
            .ok_or(HierarchyError::NotFound(*id))?;
        let old_parent = std::mem::replace(&mut unit.parent, new_parent);

        if let Some(old) = old_parent {
            if let Some(siblings) = self.children.get_mut(&old) {
                siblings.retain(|c| c != id);
            }
        }
        if let Some(new) = new_parent {
            self.children.entry(new).or_default().push(*id);
        }
        Ok(())
    }
}

impl OuGraph for OuArena {
    fn parent_of(&self, id: &OuId) -> Option<Option<OuId>> {
        self.units.get(id).map(|u| u.parent)
    }

    fn children_of(&self, id: &OuId) -> Vec<OuId> {
        self.children.get(id).cloned().unwrap_or_default()
    }

    fn contains(&self, id: &OuId) -> bool {
        self.units.contains_key(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory unit store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOuStore {
    inner: RwLock<OuArena>,
}

impl InMemoryOuStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_units(units: impl IntoIterator<Item = OrganizationalUnit>) -> Self {
        Self {
            inner: RwLock::new(OuArena::from_units(units)),
        }
    }

    // A poisoned lock still guards a consistent arena: every write validates
    // before it mutates.
    fn read(&self) -> RwLockReadGuard<'_, OuArena> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, OuArena> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl OuGraph for InMemoryOuStore {
    fn parent_of(&self, id: &OuId) -> Option<Option<OuId>> {
        self.read().parent_of(id)
    }

    fn children_of(&self, id: &OuId) -> Vec<OuId> {
        self.read().children_of(id)
    }

    fn contains(&self, id: &OuId) -> bool {
        self.read().contains(id)
    }
}

impl OuStore for InMemoryOuStore {
    fn get(&self, id: &OuId) -> Option<OrganizationalUnit> {
        self.read().get(id).cloned()
    }

    fn list(&self) -> Vec<OrganizationalUnit> {
        self.read().units().cloned().collect()
    }

    fn insert(
        &self,
        unit: OrganizationalUnit,
        validate: &dyn Fn(&dyn OuGraph) -> Result<(), HierarchyError>,
    ) -> Result<(), HierarchyError> {
        let mut arena = self.write();
        validate(&*arena)?;
        arena.insert(unit)
    }

    fn set_active(&self, id: &OuId, active: bool) -> Result<(), HierarchyError> {
        self.write().set_active(id, active)
    }

    fn update_parent(
        &self,
        id: &OuId,
        new_parent: Option<OuId>,
        validate: &dyn Fn(&dyn OuGraph) -> Result<(), HierarchyError>,
    ) -> Result<(), HierarchyError> {
        let mut arena = self.write();
        validate(&*arena)?;
        arena.set_parent(id, new_parent)
    }
}
