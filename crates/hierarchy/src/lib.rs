//! `orgguard-hierarchy` — organizational-unit forest and closure queries.
//!
//! Units are kept in an arena keyed by [`OuId`]; the parent link is an id,
//! never a reference. Everything that scopes data "to this unit and below"
//! (or "above") goes through [`OuHierarchyService`].

pub mod closure;
pub mod error;
pub mod service;
pub mod store;
pub mod unit;

pub use closure::{Descendant, Descendants};
pub use error::HierarchyError;
pub use service::{HierarchyConfig, OrgChartNode, OuHierarchyService};
pub use store::{InMemoryOuStore, OuArena, OuGraph, OuStore};
pub use unit::OrganizationalUnit;

pub use orgguard_core::OuId;
