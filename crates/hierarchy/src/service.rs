//! Closure queries and validated mutations over a unit store.

use serde::Serialize;

use orgguard_core::OuId;

use crate::closure::{self, Descendants};
use crate::error::HierarchyError;
use crate::store::{OuGraph, OuStore};
use crate::unit::OrganizationalUnit;

/// Default bound on parent hops for any ancestor walk.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HierarchyConfig {
    /// Maximum number of parent hops from any unit to its root.
    pub max_depth: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Nested view of a subtree, for org-chart rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgChartNode {
    pub unit: OrganizationalUnit,
    pub depth: usize,
    pub children: Vec<OrgChartNode>,
}

impl OrgChartNode {
    /// Number of units in this subtree, self included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(OrgChartNode::size).sum::<usize>()
    }
}

/// Ancestor/descendant closures and cycle-safe reparenting.
pub struct OuHierarchyService<S> {
    store: S,
    config: HierarchyConfig,
}

impl<S> OuHierarchyService<S>
where
    S: OuStore,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, HierarchyConfig::default())
    }

    pub fn with_config(store: S, config: HierarchyConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> HierarchyConfig {
        self.config
    }

    /// `[id, parent(id), ..., root]`.
    pub fn ancestors(&self, id: &OuId) -> Result<Vec<OuId>, HierarchyError> {
        closure::ancestors(&self.store, id, self.config.max_depth)
    }

    /// Every unit at or below `id`, tagged with its distance from `id`.
    pub fn descendants(&self, id: &OuId) -> Result<Descendants, HierarchyError> {
        let closure = closure::descendants(&self.store, id, None)?;
        tracing::debug!(unit = %id, size = closure.len(), "descendant closure computed");
        Ok(closure)
    }

    /// Descendants no more than `levels` below `id`.
    pub fn descendants_within(&self, id: &OuId, levels: usize) -> Result<Descendants, HierarchyError> {
        closure::descendants(&self.store, id, Some(levels))
    }

    /// True iff `candidate == scope` or `candidate` is in the descendant
    /// closure of `scope`.
    ///
    /// Both ids must exist.
    pub fn is_within(&self, candidate: &OuId, scope: &OuId) -> Result<bool, HierarchyError> {
        if !self.store.contains(candidate) {
            return Err(HierarchyError::NotFound(*candidate));
        }
        if candidate == scope {
            return Ok(true);
        }
        Ok(closure::descendants(&self.store, scope, None)?.contains(candidate))
    }

    /// True iff `ancestor` lies strictly above `of`.
    pub fn is_ancestor(&self, ancestor: &OuId, of: &OuId) -> Result<bool, HierarchyError> {
        Ok(ancestor != of && self.is_within(of, ancestor)?)
    }

    /// Check that `id` may be moved under `new_parent`.
    pub fn validate_reparenting(&self, id: &OuId, new_parent: &OuId) -> Result<(), HierarchyError> {
        closure::check_reparent(&self.store, id, new_parent, self.config.max_depth)
    }

    /// Move `id` under `new_parent` (`None` detaches it as a new root).
    ///
    /// Validation runs inside the store's write critical section.
    pub fn reparent(&self, id: &OuId, new_parent: Option<OuId>) -> Result<(), HierarchyError> {
        let max_depth = self.config.max_depth;
        let result = self.store.update_parent(id, new_parent, &|graph: &dyn OuGraph| {
            match new_parent {
                Some(parent) => closure::check_reparent(graph, id, &parent, max_depth),
                None if graph.contains(id) => Ok(()),
                None => Err(HierarchyError::NotFound(*id)),
            }
        });

        match &result {
            Ok(()) => tracing::info!(unit = %id, new_parent = ?new_parent, "unit reparented"),
            Err(e) => tracing::warn!(unit = %id, new_parent = ?new_parent, error = %e, "reparent rejected"),
        }
        result
    }

    /// Add a unit under an existing parent (or as a root).
    ///
    /// The depth bound is checked inside the store's write critical section,
    /// so every stored chain stays within `max_depth` hops.
    pub fn insert(&self, unit: OrganizationalUnit) -> Result<(), HierarchyError> {
        let (id, parent) = (unit.id, unit.parent);
        let max_depth = self.config.max_depth;
        self.store.insert(unit, &|graph: &dyn OuGraph| {
            closure::check_insert(graph, &id, parent.as_ref(), max_depth)
        })?;
        tracing::debug!(unit = %id, "unit inserted");
        Ok(())
    }

    pub fn get(&self, id: &OuId) -> Result<OrganizationalUnit, HierarchyError> {
        self.store.get(id).ok_or(HierarchyError::NotFound(*id))
    }

    /// Direct children of `id`.
    pub fn children(&self, id: &OuId) -> Result<Vec<OrganizationalUnit>, HierarchyError> {
        if !self.store.contains(id) {
            return Err(HierarchyError::NotFound(*id));
        }
        self.store
            .children_of(id)
            .iter()
            .map(|child| self.get(child))
            .collect()
    }

    /// All units without a parent.
    pub fn roots(&self) -> Vec<OrganizationalUnit> {
        let mut roots: Vec<_> = self.store.list().into_iter().filter(|u| u.is_root()).collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        roots
    }

    /// Root-first unit names from the top of the tree down to `id`.
    pub fn breadcrumb(&self, id: &OuId) -> Result<Vec<String>, HierarchyError> {
        let mut chain = self.ancestors(id)?;
        chain.reverse();
        chain
            .iter()
            .map(|unit| self.get(unit).map(|u| u.name))
            .collect()
    }

    /// Nested subtree rooted at `id`.
    pub fn org_chart(&self, id: &OuId) -> Result<OrgChartNode, HierarchyError> {
        // Fails fast on corrupt data before the recursive build.
        let closure = self.descendants(id)?;
        self.chart_node(id, 0, &closure)
    }

    fn chart_node(
        &self,
        id: &OuId,
        depth: usize,
        closure: &Descendants,
    ) -> Result<OrgChartNode, HierarchyError> {
        let unit = self.get(id)?;
        let children = self
            .store
            .children_of(id)
            .iter()
            .filter(|child| closure.contains(child))
            .map(|child| self.chart_node(child, depth + 1, closure))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OrgChartNode {
            unit,
            depth,
            children,
        })
    }

    /// Case-insensitive name search limited to `scope` and its descendants.
    ///
    /// An empty query matches every unit in scope. Results are in
    /// breadth-first order.
    pub fn search_within(
        &self,
        scope: &OuId,
        query: &str,
        active_only: bool,
    ) -> Result<Vec<OrganizationalUnit>, HierarchyError> {
        let needle = query.trim().to_lowercase();
        let closure = self.descendants(scope)?;

        let mut hits = Vec::new();
        for id in closure.ids() {
            let unit = self.get(&id)?;
            if active_only && !unit.active {
                continue;
            }
            if needle.is_empty() || unit.name.to_lowercase().contains(&needle) {
                hits.push(unit);
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::store::InMemoryOuStore;

    struct Abc {
        service: OuHierarchyService<InMemoryOuStore>,
        a: OuId,
        b: OuId,
        c: OuId,
    }

    /// A (root) -> B -> C
    fn abc() -> Abc {
        let service = OuHierarchyService::new(InMemoryOuStore::new());
        let a = OrganizationalUnit::new("A");
        let b = OrganizationalUnit::new("B").with_parent(a.id);
        let c = OrganizationalUnit::new("C").with_parent(b.id);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        service.insert(a).unwrap();
        service.insert(b).unwrap();
        service.insert(c).unwrap();
        Abc {
            service,
            a: a_id,
            b: b_id,
            c: c_id,
        }
    }

    #[test]
    fn abc_ancestors_and_descendants() {
        let t = abc();

        assert_eq!(t.service.ancestors(&t.c).unwrap(), vec![t.c, t.b, t.a]);
        assert_eq!(t.service.ancestors(&t.a).unwrap(), vec![t.a]);

        let closure = t.service.descendants(&t.a).unwrap();
        let got: HashSet<(OuId, usize)> = closure.iter().map(|d| (d.id, d.depth)).collect();
        let want = HashSet::from([(t.a, 0), (t.b, 1), (t.c, 2)]);
        assert_eq!(got, want);

        let leaf = t.service.descendants(&t.c).unwrap();
        assert_eq!(leaf.ids().collect::<Vec<_>>(), vec![t.c]);
        assert_eq!(leaf.depth_of(&t.c), Some(0));
    }

    #[test]
    fn reparenting_root_under_its_leaf_is_a_cycle() {
        let t = abc();

        assert_eq!(
            t.service.validate_reparenting(&t.a, &t.c),
            Err(HierarchyError::CycleDetected {
                unit: t.a,
                new_parent: t.c
            })
        );
        assert!(matches!(
            t.service.validate_reparenting(&t.b, &t.b),
            Err(HierarchyError::CycleDetected { .. })
        ));
        assert!(t.service.reparent(&t.a, Some(t.c)).is_err());
        assert_eq!(t.service.ancestors(&t.c).unwrap(), vec![t.c, t.b, t.a]);
    }

    #[test]
    fn unknown_ids_are_not_found_rather_than_empty() {
        let t = abc();
        let ghost = OuId::new();

        assert_eq!(t.service.ancestors(&ghost), Err(HierarchyError::NotFound(ghost)));
        assert_eq!(
            t.service.descendants(&ghost).unwrap_err(),
            HierarchyError::NotFound(ghost)
        );
        assert_eq!(t.service.is_within(&t.a, &ghost), Err(HierarchyError::NotFound(ghost)));
        assert_eq!(t.service.is_within(&ghost, &t.a), Err(HierarchyError::NotFound(ghost)));
        assert_eq!(
            t.service.validate_reparenting(&t.a, &ghost),
            Err(HierarchyError::NotFound(ghost))
        );
    }

    #[test]
    fn is_within_and_is_ancestor() {
        let t = abc();

        assert!(t.service.is_within(&t.c, &t.a).unwrap());
        assert!(t.service.is_within(&t.b, &t.b).unwrap());
        assert!(!t.service.is_within(&t.a, &t.c).unwrap());

        assert!(t.service.is_ancestor(&t.a, &t.c).unwrap());
        assert!(!t.service.is_ancestor(&t.c, &t.c).unwrap());
    }

    #[test]
    fn reparent_moves_whole_subtree() {
        let t = abc();
        let d = OrganizationalUnit::new("D");
        let d_id = d.id;
        t.service.insert(d).unwrap();

        t.service.reparent(&t.b, Some(d_id)).unwrap();

        assert_eq!(t.service.ancestors(&t.c).unwrap(), vec![t.c, t.b, d_id]);
        assert_eq!(t.service.descendants(&t.a).unwrap().len(), 1);
        assert_eq!(t.service.descendants(&d_id).unwrap().depth_of(&t.c), Some(2));

        t.service.reparent(&t.b, None).unwrap();
        assert_eq!(t.service.ancestors(&t.b).unwrap(), vec![t.b]);
    }

    #[test]
    fn reparent_respects_configured_depth() {
        let store = InMemoryOuStore::new();
        let service = OuHierarchyService::with_config(store, HierarchyConfig { max_depth: 1 });
        let a = OrganizationalUnit::new("A");
        let b = OrganizationalUnit::new("B").with_parent(a.id);
        let c = OrganizationalUnit::new("C");
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        service.insert(a).unwrap();
        service.insert(b).unwrap();
        service.insert(c).unwrap();

        assert!(matches!(
            service.reparent(&c_id, Some(b_id)),
            Err(HierarchyError::DepthExceeded { .. })
        ));
        assert!(service.reparent(&c_id, Some(a_id)).is_ok());
    }

    #[test]
    fn insert_respects_configured_depth() {
        let service = OuHierarchyService::with_config(InMemoryOuStore::new(), HierarchyConfig { max_depth: 2 });
        let a = OrganizationalUnit::new("A");
        let b = OrganizationalUnit::new("B").with_parent(a.id);
        let c = OrganizationalUnit::new("C").with_parent(b.id);
        let d = OrganizationalUnit::new("D").with_parent(c.id);
        let (a_id, c_id, d_id) = (a.id, c.id, d.id);
        service.insert(a).unwrap();
        service.insert(b).unwrap();
        service.insert(c).unwrap();

        assert_eq!(
            service.insert(d),
            Err(HierarchyError::DepthExceeded {
                unit: d_id,
                max_depth: 2
            })
        );
        assert!(service.get(&d_id).is_err());

        // Everything that was accepted stays readable in both directions.
        assert!(service.is_within(&c_id, &c_id).unwrap());
        assert!(service.is_within(&c_id, &a_id).unwrap());
        assert_eq!(service.ancestors(&c_id).unwrap().len(), 3);
        assert_eq!(service.descendants(&a_id).unwrap().depth_of(&c_id), Some(2));
    }

    #[test]
    fn is_within_agrees_with_descendants_on_loaded_data() {
        // Loaded without validation, deeper than the configured bound.
        let a = OrganizationalUnit::new("A");
        let b = OrganizationalUnit::new("B").with_parent(a.id);
        let c = OrganizationalUnit::new("C").with_parent(b.id);
        let d = OrganizationalUnit::new("D").with_parent(c.id);
        let (a_id, d_id) = (a.id, d.id);
        let store = InMemoryOuStore::from_units([a, b, c, d]);
        let service = OuHierarchyService::with_config(store, HierarchyConfig { max_depth: 2 });

        assert_eq!(service.descendants(&a_id).unwrap().depth_of(&d_id), Some(3));
        assert_eq!(service.is_within(&d_id, &d_id), Ok(true));
        assert_eq!(service.is_within(&d_id, &a_id), Ok(true));
        assert_eq!(service.is_within(&a_id, &d_id), Ok(false));
        assert!(matches!(
            service.ancestors(&d_id),
            Err(HierarchyError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn navigation_helpers() {
        let t = abc();
        let b2 = OrganizationalUnit::new("B2 Sales").with_parent(t.a);
        let b2_id = b2.id;
        t.service.insert(b2).unwrap();
        t.service.store().set_active(&b2_id, false).unwrap();

        let children: Vec<_> = t.service.children(&t.a).unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(children, vec![t.b, b2_id]);

        assert_eq!(t.service.roots().len(), 1);
        assert_eq!(t.service.breadcrumb(&t.c).unwrap(), vec!["A", "B", "C"]);

        let chart = t.service.org_chart(&t.a).unwrap();
        assert_eq!(chart.size(), 4);
        assert_eq!(chart.children[0].children[0].unit.id, t.c);
        assert_eq!(chart.children[0].children[0].depth, 2);

        let direct: Vec<_> = t.service.descendants_within(&t.a, 1).unwrap().at_depth(1).collect();
        assert_eq!(direct, vec![t.b, b2_id]);

        let hits = t.service.search_within(&t.a, "b", false).unwrap();
        assert_eq!(hits.len(), 2);
        let active_hits = t.service.search_within(&t.a, "B", true).unwrap();
        assert_eq!(active_hits.iter().map(|u| u.id).collect::<Vec<_>>(), vec![t.b]);
        assert!(t.service.search_within(&t.c, "a", false).unwrap().is_empty());
    }

    #[test]
    fn shared_store_sees_concurrent_inserts() {
        let service = Arc::new(OuHierarchyService::new(InMemoryOuStore::new()));
        let root = OrganizationalUnit::new("root");
        let root_id = root.id;
        service.insert(root).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    service
                        .insert(OrganizationalUnit::new(format!("child-{i}")).with_parent(root_id))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(service.descendants(&root_id).unwrap().at_depth(1).count(), 8);
    }

    /// Random forest: unit `i` gets parent `parents[i] % i` (or none).
    fn build_forest(parents: &[Option<usize>]) -> (OuHierarchyService<InMemoryOuStore>, Vec<OuId>) {
        let service = OuHierarchyService::new(InMemoryOuStore::new());
        let mut ids = Vec::with_capacity(parents.len());
        for (i, parent) in parents.iter().enumerate() {
            let mut unit = OrganizationalUnit::new(format!("ou-{i}"));
            if let Some(p) = parent.filter(|_| i > 0) {
                unit = unit.with_parent(ids[p % i]);
            }
            ids.push(unit.id);
            service.insert(unit).unwrap();
        }
        (service, ids)
    }

    fn forest_strategy() -> impl Strategy<Value = Vec<Option<usize>>> {
        prop::collection::vec(prop::option::weighted(0.8, 0usize..1_000), 1..40)
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: every non-root unit sits at depth 1 under its parent.
        #[test]
        fn child_is_direct_descendant_of_parent(parents in forest_strategy()) {
            let (service, ids) = build_forest(&parents);
            for id in &ids {
                let unit = service.get(id).unwrap();
                if let Some(parent) = unit.parent {
                    prop_assert_eq!(service.descendants(&parent).unwrap().depth_of(id), Some(1));
                }
            }
        }

        /// Property: a unit is always within itself, and roots have a
        /// singleton ancestor chain.
        #[test]
        fn reflexive_scope_and_root_chain(parents in forest_strategy()) {
            let (service, ids) = build_forest(&parents);
            for id in &ids {
                prop_assert!(service.is_within(id, id).unwrap());
                if service.get(id).unwrap().is_root() {
                    prop_assert_eq!(service.ancestors(id).unwrap(), vec![*id]);
                }
            }
        }

        /// Property: reparenting X under Y is a cycle exactly when X is an
        /// ancestor-or-self of Y.
        #[test]
        fn cycle_detected_iff_in_ancestor_chain(
            parents in forest_strategy(),
            x in 0usize..1_000,
            y in 0usize..1_000,
        ) {
            let (service, ids) = build_forest(&parents);
            let x = ids[x % ids.len()];
            let y = ids[y % ids.len()];

            let in_chain = service.ancestors(&y).unwrap().contains(&x);
            let is_cycle = matches!(
                service.validate_reparenting(&x, &y),
                Err(HierarchyError::CycleDetected { .. })
            );
            prop_assert_eq!(in_chain, is_cycle);
        }

        /// Property: closures are stable without intervening writes.
        #[test]
        fn descendants_idempotent(parents in forest_strategy(), pick in 0usize..1_000) {
            let (service, ids) = build_forest(&parents);
            let id = ids[pick % ids.len()];

            let first = service.descendants(&id).unwrap();
            let second = service.descendants(&id).unwrap();
            prop_assert_eq!(&first, &second);

            let as_set: BTreeSet<_> = first.iter().map(|d| (d.id, d.depth)).collect();
            prop_assert_eq!(as_set.len(), first.len());
        }
    }
}
