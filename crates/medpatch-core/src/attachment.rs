//! Attachment relation between patches and their targets.
//!
//! Whether something is physically stuck is decided by the host. The engine
//! only asks who a patch is stuck to, asks for detachment, and reacts to the
//! [`AttachmentEvent`]s the relation emits.

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::id::EntityId;

/// Notification emitted when the relation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentEvent {
    /// `user` stuck `patch` onto `target`.
    Attached {
        patch: EntityId,
        target: EntityId,
        user: EntityId,
    },
    /// `patch` came off `target`.
    Detached { patch: EntityId, target: EntityId },
}

impl AttachmentEvent {
    /// The patch entity this notification is about.
    pub fn patch(&self) -> EntityId {
        match self {
            AttachmentEvent::Attached { patch, .. } | AttachmentEvent::Detached { patch, .. } => {
                *patch
            }
        }
    }
}

/// Read access to the relation plus advisory detachment.
pub trait AttachmentRelation {
    /// The entity `patch` is currently stuck to.
    fn current_target(&self, patch: EntityId) -> Option<EntityId>;

    /// Ask the relation to detach `patch` from `target`. The relation may
    /// refuse; when it accepts it returns the resulting `Detached`
    /// notification, which the caller must deliver.
    fn request_detach(&mut self, patch: EntityId, target: EntityId) -> Option<AttachmentEvent>;
}

/// In-memory relation: each patch is stuck to at most one target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StickyRelation {
    stuck_to: SecondaryMap<EntityId, EntityId>,
    /// Patches that refuse detach requests (e.g. taped down).
    locked: SecondaryMap<EntityId, ()>,
}

impl StickyRelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stick `patch` onto `target`. Returns `None` when the patch is already
    /// stuck somewhere or would be stuck to itself.
    pub fn stick(
        &mut self,
        patch: EntityId,
        target: EntityId,
        user: EntityId,
    ) -> Option<AttachmentEvent> {
        if patch == target || self.stuck_to.contains_key(patch) {
            return None;
        }
        self.stuck_to.insert(patch, target);
        Some(AttachmentEvent::Attached {
            patch,
            target,
            user,
        })
    }

    /// Forcefully peel `patch` off whatever it is stuck to. Ignores locks.
    pub fn unstick(&mut self, patch: EntityId) -> Option<AttachmentEvent> {
        let target = self.stuck_to.remove(patch)?;
        Some(AttachmentEvent::Detached { patch, target })
    }

    /// Make `patch` refuse (`true`) or honour (`false`) detach requests.
    pub fn set_locked(&mut self, patch: EntityId, locked: bool) {
        if locked {
            self.locked.insert(patch, ());
        } else {
            self.locked.remove(patch);
        }
    }

    pub fn is_locked(&self, patch: EntityId) -> bool {
        self.locked.contains_key(patch)
    }

    /// Drop every relation `entity` takes part in, as patch or as target.
    /// Returns the `Detached` notifications for relations that ended.
    pub fn forget(&mut self, entity: EntityId) -> Vec<AttachmentEvent> {
        self.locked.remove(entity);
        let patches: Vec<EntityId> = self
            .stuck_to
            .iter()
            .filter(|(patch, target)| *patch == entity || **target == entity)
            .map(|(patch, _)| patch)
            .collect();
        patches
            .into_iter()
            .filter_map(|patch| self.unstick(patch))
            .collect()
    }

    /// Number of patches currently stuck to something.
    pub fn len(&self) -> usize {
        self.stuck_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stuck_to.is_empty()
    }
}

impl AttachmentRelation for StickyRelation {
    fn current_target(&self, patch: EntityId) -> Option<EntityId> {
        self.stuck_to.get(patch).copied()
    }

    fn request_detach(&mut self, patch: EntityId, target: EntityId) -> Option<AttachmentEvent> {
        if self.is_locked(patch) || self.current_target(patch) != Some(target) {
            return None;
        }
        self.unstick(patch)
    }
}
