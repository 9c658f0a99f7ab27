//! Ancestor/descendant closure algorithms over an [`OuGraph`].
//!
//! These are pure functions of the graph they are handed. The service runs
//! them against the store for reads and against the locked arena for
//! validated writes.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use orgguard_core::OuId;

use crate::error::HierarchyError;
use crate::store::OuGraph;

/// One member of a descendant closure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Descendant {
    pub id: OuId,
    /// Distance from the closure root (0 for the root itself).
    pub depth: usize,
}

/// Descendant closure of a unit: every unit at or below it, tagged with depth.
///
/// Entries are kept in breadth-first order, so all units at depth `n` come
/// before any unit at depth `n + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descendants {
    entries: Vec<Descendant>,
    depths: HashMap<OuId, usize>,
}

impl Descendants {
    fn rooted_at(root: OuId) -> Self {
        Self {
            entries: vec![Descendant { id: root, depth: 0 }],
            depths: HashMap::from([(root, 0)]),
        }
    }

    fn push(&mut self, id: OuId, depth: usize) {
        self.entries.push(Descendant { id, depth });
        self.depths.insert(id, depth);
    }

    pub fn root(&self) -> OuId {
        self.entries[0].id
    }

    /// Number of units in the closure, root included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a closure contains at least its root.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &OuId) -> bool {
        self.depths.contains_key(id)
    }

    pub fn depth_of(&self, id: &OuId) -> Option<usize> {
        self.depths.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descendant> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = OuId> + '_ {
        self.entries.iter().map(|d| d.id)
    }

    /// Units exactly `depth` levels below the root.
    pub fn at_depth(&self, depth: usize) -> impl Iterator<Item = OuId> + '_ {
        self.entries
            .iter()
            .filter(move |d| d.depth == depth)
            .map(|d| d.id)
    }

    /// Height of the subtree (0 for a leaf).
    pub fn height(&self) -> usize {
        self.entries.last().map(|d| d.depth).unwrap_or(0)
    }

    pub fn depth_map(&self) -> &HashMap<OuId, usize> {
        &self.depths
    }
}

impl IntoIterator for Descendants {
    type Item = Descendant;
    type IntoIter = std::vec::IntoIter<Descendant>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Ancestor chain of `id`: `[id, parent(id), ..., root]`.
///
/// Follows at most `max_depth` parent hops. A longer chain means the graph
/// holds a cycle and is reported as [`HierarchyError::DepthExceeded`].
pub fn ancestors<G>(graph: &G, id: &OuId, max_depth: usize) -> Result<Vec<OuId>, HierarchyError>
where
    G: OuGraph + ?Sized,
{
    let mut next = graph.parent_of(id).ok_or(HierarchyError::NotFound(*id))?;
    let mut chain = vec![*id];

    while let Some(parent) = next {
        if chain.len() > max_depth {
            tracing::error!(unit = %id, max_depth, "ancestor walk exceeded max depth");
            return Err(HierarchyError::DepthExceeded {
                unit: *id,
                max_depth,
            });
        }
        next = graph
            .parent_of(&parent)
            .ok_or_else(|| HierarchyError::CorruptHierarchy {
                unit: chain[chain.len() - 1],
                reason: format!("parent {parent} does not exist"),
            })?;
        chain.push(parent);
    }

    Ok(chain)
}

/// Descendant closure of `id`, breadth-first over the children relation.
///
/// `max_levels` limits how far below `id` the walk goes (`Some(1)` = direct
/// children only).
pub fn descendants<G>(
    graph: &G,
    id: &OuId,
    max_levels: Option<usize>,
) -> Result<Descendants, HierarchyError>
where
    G: OuGraph + ?Sized,
{
    if !graph.contains(id) {
        return Err(HierarchyError::NotFound(*id));
    }

    let mut closure = Descendants::rooted_at(*id);
    let mut queue = VecDeque::from([(*id, 0usize)]);

    while let Some((current, depth)) = queue.pop_front() {
        if max_levels.is_some_and(|limit| depth >= limit) {
            continue;
        }
        for child in graph.children_of(&current) {
            if closure.contains(&child) {
                tracing::error!(unit = %child, root = %id, "unit reached twice while descending");
                return Err(HierarchyError::CorruptHierarchy {
                    unit: child,
                    reason: "reachable along more than one path".to_string(),
                });
            }
            closure.push(child, depth + 1);
            queue.push_back((child, depth + 1));
        }
    }

    Ok(closure)
}

/// Reject inserting `unit` under `parent` if the new unit would sit more than
/// `max_depth` hops below its root.
///
/// Keeps every stored chain walkable by [`ancestors`].
pub fn check_insert<G>(
    graph: &G,
    unit: &OuId,
    parent: Option<&OuId>,
    max_depth: usize,
) -> Result<(), HierarchyError>
where
    G: OuGraph + ?Sized,
{
    let Some(parent) = parent else {
        return Ok(());
    };
    if !graph.contains(parent) {
        return Err(HierarchyError::NotFound(*parent));
    }
    // The new unit sits chain.len() hops below the root.
    if ancestors(graph, parent, max_depth)?.len() > max_depth {
        return Err(HierarchyError::DepthExceeded {
            unit: *unit,
            max_depth,
        });
    }
    Ok(())
}

/// Reject moving `id` under `new_parent` if it would form a cycle or push the
/// moved subtree past `max_depth`.
pub fn check_reparent<G>(
    graph: &G,
    id: &OuId,
    new_parent: &OuId,
    max_depth: usize,
) -> Result<(), HierarchyError>
where
    G: OuGraph + ?Sized,
{
    if !graph.contains(id) {
        return Err(HierarchyError::NotFound(*id));
    }
    if id == new_parent {
        return Err(HierarchyError::CycleDetected {
            unit: *id,
            new_parent: *new_parent,
        });
    }

    let chain = ancestors(graph, new_parent, max_depth)?;
    if chain.contains(id) {
        return Err(HierarchyError::CycleDetected {
            unit: *id,
            new_parent: *new_parent,
        });
    }

    // new_parent sits chain.len() - 1 hops below its root; the moved unit one
    // further, and its deepest descendant `height` further still.
    let height = descendants(graph, id, None)?.height();
    if chain.len() + height > max_depth {
        return Err(HierarchyError::DepthExceeded {
            unit: *id,
            max_depth,
        });
    }

    Ok(())
}
