use thiserror::Error;

use orgguard_core::OuId;

/// Failures raised by hierarchy reads and writes.
///
/// `NotFound` is distinct from an empty result: callers must be able to tell
/// "unknown unit" apart from "no relationship".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("organizational unit {0} not found")]
    NotFound(OuId),

    #[error("organizational unit {0} already exists")]
    Duplicate(OuId),

    /// Reparenting `unit` under `new_parent` would close a loop.
    #[error("moving {unit} under {new_parent} would create a cycle")]
    CycleDetected { unit: OuId, new_parent: OuId },

    /// The ancestor walk from `unit` did not reach a root within `max_depth` hops.
    #[error("ancestor chain of {unit} exceeds {max_depth} hops")]
    DepthExceeded { unit: OuId, max_depth: usize },

    /// The persisted graph violates the forest invariant.
    #[error("hierarchy is corrupt at {unit}: {reason}")]
    CorruptHierarchy { unit: OuId, reason: String },
}

impl HierarchyError {
    /// Data-integrity failures (as opposed to caller mistakes).
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            HierarchyError::DepthExceeded { .. } | HierarchyError::CorruptHierarchy { .. }
        )
    }
}
