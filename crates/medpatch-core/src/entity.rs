//! Entity lifetime: the disposal seam and the reference entity store.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::id::EntityId;

/// Removes or transforms entities on behalf of the patch engine.
pub trait EntityDisposer {
    /// Queue `entity` for deletion. Returns false if it does not exist.
    fn delete(&mut self, entity: EntityId) -> bool;

    /// Replace `entity` with a fresh entity spawned from `prototype`.
    fn transform(&mut self, entity: EntityId, prototype: &str) -> Result<EntityId, DisposeError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisposeError {
    #[error("unknown prototype '{0}'")]
    UnknownPrototype(String),
    #[error("entity {0:?} does not exist")]
    MissingEntity(EntityId),
}

/// Per-entity metadata kept by the reference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub prototype: String,
}

/// Arena of entities with deferred deletion.
///
/// Deleted entities disappear from the arena immediately and are also
/// recorded so the host can clean up the state it keeps elsewhere
/// (solutions, attachments, patches) via [`take_deleted`](Self::take_deleted).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    entities: SlotMap<EntityId, EntityMeta>,
    /// Prototypes that `transform` may spawn.
    prototypes: BTreeSet<String>,
    deleted: Vec<EntityId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an entity. The prototype becomes a valid transform target.
    pub fn spawn(&mut self, prototype: impl Into<String>) -> EntityId {
        let prototype = prototype.into();
        self.prototypes.insert(prototype.clone());
        self.entities.insert(EntityMeta { prototype })
    }

    /// Allow `transform` to spawn `prototype` without spawning one now.
    pub fn register_prototype(&mut self, prototype: impl Into<String>) {
        self.prototypes.insert(prototype.into());
    }

    pub fn get(&self, entity: EntityId) -> Option<&EntityMeta> {
        self.entities.get(entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities deleted since the last call, in deletion order.
    pub fn take_deleted(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.deleted)
    }

    /// Count entities spawned from `prototype`.
    pub fn count_prototype(&self, prototype: &str) -> usize {
        self.entities
            .values()
            .filter(|m| m.prototype == prototype)
            .count()
    }
}

impl EntityDisposer for EntityStore {
    fn delete(&mut self, entity: EntityId) -> bool {
        if self.entities.remove(entity).is_some() {
            self.deleted.push(entity);
            true
        } else {
            false
        }
    }

    fn transform(&mut self, entity: EntityId, prototype: &str) -> Result<EntityId, DisposeError> {
        if !self.contains(entity) {
            return Err(DisposeError::MissingEntity(entity));
        }
        if !self.prototypes.contains(prototype) {
            return Err(DisposeError::UnknownPrototype(prototype.to_string()));
        }
        let replacement = self.entities.insert(EntityMeta {
            prototype: prototype.to_string(),
        });
        self.delete(entity);
        Ok(replacement)
    }
}
