//! Registry of active patches.
//!
//! Patches live in a slot map keyed by [`PatchId`], with a secondary index so
//! notifications (which name the patch *entity*) resolve in O(1). The
//! scheduler iterates this registry instead of querying any global store.

use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

use crate::id::{EntityId, PatchId};
use crate::patch::{Patch, PatchError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchRegistry {
    patches: SlotMap<PatchId, Patch>,
    by_entity: SecondaryMap<EntityId, PatchId>,
}

impl PatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a patch. An entity carries at most one patch.
    pub fn insert(&mut self, patch: Patch) -> Result<PatchId, PatchError> {
        let entity = patch.entity;
        if self.by_entity.contains_key(entity) {
            return Err(PatchError::AlreadyRegistered(entity));
        }
        let id = self.patches.insert(patch);
        self.by_entity.insert(entity, id);
        Ok(id)
    }

    /// Remove a patch from the active population.
    pub fn remove(&mut self, id: PatchId) -> Option<Patch> {
        let patch = self.patches.remove(id)?;
        self.by_entity.remove(patch.entity);
        Some(patch)
    }

    /// Remove the patch carried by `entity`, if any.
    pub fn remove_entity(&mut self, entity: EntityId) -> Option<Patch> {
        let id = self.by_entity.get(entity).copied()?;
        self.remove(id)
    }

    pub fn get(&self, id: PatchId) -> Option<&Patch> {
        self.patches.get(id)
    }

    pub fn get_mut(&mut self, id: PatchId) -> Option<&mut Patch> {
        self.patches.get_mut(id)
    }

    /// Resolve a patch entity to its registry id.
    pub fn id_of(&self, entity: EntityId) -> Option<PatchId> {
        self.by_entity.get(entity).copied()
    }

    pub fn by_entity(&self, entity: EntityId) -> Option<&Patch> {
        self.id_of(entity).and_then(|id| self.patches.get(id))
    }

    pub fn contains_entity(&self, entity: EntityId) -> bool {
        self.by_entity.contains_key(entity)
    }

    /// Snapshot of all ids, so callers can mutate the registry while walking.
    pub fn ids(&self) -> Vec<PatchId> {
        self.patches.keys().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatchId, &Patch)> + '_ {
        self.patches.iter()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}
