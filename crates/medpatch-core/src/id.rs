use std::fmt;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies an entity in the host world (patch, patient, user, ...).
    pub struct EntityId;

    /// Identifies an active patch in the [`PatchRegistry`](crate::registry::PatchRegistry).
    pub struct PatchId;

    /// Handle to one solution owned by an entity.
    pub struct SolutionId;
}

/// Identifies a reagent type. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReagentId(pub u32);

impl fmt::Display for ReagentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reagent#{}", self.0)
    }
}
