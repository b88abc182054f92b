//! In-memory recorders for the write-only collaborators.
//!
//! Used by the reference host and by tests that need to assert on popups,
//! audit entries or reactions.

use serde::{Deserialize, Serialize};

use crate::context::{AuditEntry, AuditLog, Notifications, ReactionMethod, Reactions};
use crate::id::EntityId;
use crate::solution::Solution;

/// A popup shown at an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Popup {
    pub target: EntityId,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopupLog {
    pub popups: Vec<Popup>,
}

impl PopupLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Popups shown at `target`, oldest first.
    pub fn for_target(&self, target: EntityId) -> impl Iterator<Item = &Popup> + '_ {
        self.popups.iter().filter(move |p| p.target == target)
    }
}

impl Notifications for PopupLog {
    fn popup(&mut self, target: EntityId, message: &str) {
        tracing::debug!(?target, message, "popup");
        self.popups.push(Popup {
            target,
            message: message.to_string(),
        });
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    pub entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for AuditTrail {
    fn record(&mut self, entry: AuditEntry) {
        tracing::info!(audit = %entry, "patch applied");
        self.entries.push(entry);
    }
}

/// One reaction the host was asked to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub target: EntityId,
    pub solution: Solution,
    pub method: ReactionMethod,
}

/// Records reactions instead of resolving them. Chemistry is the host's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReactionLog {
    pub reactions: Vec<ReactionRecord>,
}

impl ReactionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reactions for ReactionLog {
    fn apply_reaction(&mut self, target: EntityId, solution: &Solution, method: ReactionMethod) {
        self.reactions.push(ReactionRecord {
            target,
            solution: solution.clone(),
            method,
        });
    }
}
