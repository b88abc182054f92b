//! Collaborator seams and the per-call context handed to the patch engine.
//!
//! The engine never owns the world. Every sweep and every notification gets
//! a [`PatchContext`] with exclusive borrows of the collaborators it may
//! touch, so no other system can mutate the same state mid-operation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attachment::AttachmentRelation;
use crate::container::SolutionContainers;
use crate::entity::EntityDisposer;
use crate::event::EventBuffer;
use crate::fixed::Ticks;
use crate::id::EntityId;
use crate::solution::Solution;

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

/// How a solution entered the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionMethod {
    Touch,
    Ingestion,
    Injection,
}

/// Resolves reagent side effects on an entity. May mutate the entity's state.
pub trait Reactions {
    fn apply_reaction(&mut self, target: EntityId, solution: &Solution, method: ReactionMethod);
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Display-only messages shown at an entity. Never affects control flow.
pub trait Notifications {
    fn popup(&mut self, target: EntityId, message: &str);
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// A write-only record of someone applying a patch to someone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor: EntityId,
    pub target: EntityId,
    pub device: EntityId,
    /// Payload as it was when the patch went on.
    pub solution: Solution,
    pub tick: Ticks,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} stuck a patch on {:?} using {:?} containing {}",
            self.actor, self.target, self.device, self.solution
        )
    }
}

pub trait AuditLog {
    fn record(&mut self, entry: AuditEntry);
}

// ---------------------------------------------------------------------------
// PatchContext
// ---------------------------------------------------------------------------

/// Mutable context passed to the transfer engine, scheduler and state machine.
pub struct PatchContext<'a> {
    pub solutions: &'a mut dyn SolutionContainers,
    pub attachments: &'a mut dyn AttachmentRelation,
    pub reactions: &'a mut dyn Reactions,
    pub notifications: &'a mut dyn Notifications,
    pub audit: &'a mut dyn AuditLog,
    pub disposer: &'a mut dyn EntityDisposer,
    /// Engine-level events (injections, detach requests, disposals).
    pub events: &'a mut EventBuffer,
    /// The current simulation tick, stamped onto events and audit entries.
    pub tick: Ticks,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed64;
    use crate::id::ReagentId;
    use slotmap::SlotMap;

    #[test]
    fn audit_entry_display_mentions_payload() {
        let mut sm = SlotMap::<EntityId, ()>::with_key();
        let entry = AuditEntry {
            actor: sm.insert(()),
            target: sm.insert(()),
            device: sm.insert(()),
            solution: Solution::new(Fixed64::from_num(10))
                .with_reagent(ReagentId(1), Fixed64::from_num(4)),
            tick: 3,
        };
        let text = entry.to_string();
        assert!(text.contains("stuck a patch on"));
        assert!(text.contains("reagent#1: 4u"));
    }
}
