//! Resolved patch content: reagent names and ready-to-spawn prototypes.

use std::collections::HashMap;

use medpatch_core::id::{EntityId, ReagentId};
use medpatch_core::patch::{Disposal, PatchError, PatchSpec};
use medpatch_core::simulation::Simulation;
use medpatch_core::solution::Solution;
use medpatch_core::transfer::TransferConfig;

// ===========================================================================
// Reagents
// ===========================================================================

/// Reagent names in registration order. A name's index is its [`ReagentId`].
#[derive(Debug, Clone, Default)]
pub struct ReagentTable {
    names: Vec<String>,
    by_name: HashMap<String, ReagentId>,
}

impl ReagentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, registering it if it is new.
    pub fn register(&mut self, name: &str) -> ReagentId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = ReagentId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<ReagentId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: ReagentId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub(crate) fn names(&self) -> &HashMap<String, ReagentId> {
        &self.by_name
    }
}

// ===========================================================================
// Prototypes
// ===========================================================================

/// A patch prototype resolved into engine types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPrototype {
    pub name: String,
    pub spec: PatchSpec,
    /// Initial payload each spawned patch starts with.
    pub payload: Solution,
}

/// Errors from spawning a patch by prototype name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error("unknown patch prototype '{0}'")]
    UnknownPrototype(String),
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Everything loaded from one content directory.
#[derive(Debug, Clone, Default)]
pub struct PatchLibrary {
    pub reagents: ReagentTable,
    pub config: TransferConfig,
    prototypes: Vec<PatchPrototype>,
    by_name: HashMap<String, usize>,
}

impl PatchLibrary {
    pub(crate) fn new(reagents: ReagentTable, config: TransferConfig) -> Self {
        Self {
            reagents,
            config,
            prototypes: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, prototype: PatchPrototype) {
        self.by_name
            .insert(prototype.name.clone(), self.prototypes.len());
        self.prototypes.push(prototype);
    }

    pub fn get(&self, name: &str) -> Option<&PatchPrototype> {
        self.by_name.get(name).map(|&i| &self.prototypes[i])
    }

    /// Prototypes in file order.
    pub fn iter(&self) -> impl Iterator<Item = &PatchPrototype> {
        self.prototypes.iter()
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }

    /// A simulation configured from this library, with every used-patch
    /// prototype registered so transform disposal can spawn it.
    pub fn simulation(&self) -> Simulation {
        let mut sim = Simulation::new(self.config.clone());
        for prototype in &self.prototypes {
            if let Disposal::TransformToUsed { prototype: used } = &prototype.spec.disposal {
                sim.entities.register_prototype(used.clone());
            }
        }
        sim
    }

    /// Spawn a fresh patch entity from the named prototype.
    pub fn spawn(&self, sim: &mut Simulation, name: &str) -> Result<EntityId, SpawnError> {
        let prototype = self
            .get(name)
            .ok_or_else(|| SpawnError::UnknownPrototype(name.to_string()))?;
        if let Disposal::TransformToUsed { prototype: used } = &prototype.spec.disposal {
            sim.entities.register_prototype(used.clone());
        }
        let entity = sim.spawn_patch(
            prototype.name.clone(),
            prototype.spec.clone(),
            prototype.payload.clone(),
        )?;
        tracing::debug!(?entity, prototype = name, "spawned patch");
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medpatch_core::test_utils::*;

    #[test]
    fn register_is_idempotent() {
        let mut table = ReagentTable::new();
        let a = table.register("bicaridine");
        let b = table.register("kelotane");
        assert_eq!(table.register("bicaridine"), a);
        assert_eq!(a, ReagentId(0));
        assert_eq!(b, ReagentId(1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.name(b), Some("kelotane"));
        assert_eq!(table.id("dylovene"), None);
    }

    fn library_with(prototype: PatchPrototype) -> PatchLibrary {
        let mut library = PatchLibrary::new(ReagentTable::new(), TransferConfig::default());
        library.insert(prototype);
        library
    }

    #[test]
    fn spawn_copies_payload() {
        let library = library_with(PatchPrototype {
            name: "BrutePatch".to_string(),
            spec: patch_spec(1.0, 1.0),
            payload: payload(8.0),
        });
        let mut sim = library.simulation();
        let a = library.spawn(&mut sim, "BrutePatch").unwrap();
        let b = library.spawn(&mut sim, "BrutePatch").unwrap();
        assert_ne!(a, b);
        assert_eq!(sim.volume(a, "drug"), fixed(8.0));
        assert_eq!(sim.volume(b, "drug"), fixed(8.0));
        assert_eq!(sim.entities.count_prototype("BrutePatch"), 2);
    }

    #[test]
    fn spawn_unknown_prototype() {
        let library = PatchLibrary::default();
        let mut sim = library.simulation();
        assert_eq!(
            library.spawn(&mut sim, "Nope"),
            Err(SpawnError::UnknownPrototype("Nope".to_string()))
        );
    }

    #[test]
    fn simulation_registers_used_prototypes() {
        let spec = PatchSpec {
            single_use: true,
            disposal: Disposal::TransformToUsed {
                prototype: "UsedPatch".to_string(),
            },
            ..patch_spec(1.0, 1.0)
        };
        let library = library_with(PatchPrototype {
            name: "TraumaPatch".to_string(),
            spec,
            payload: payload(2.0),
        });
        let mut sim = library.simulation();
        let patch = library.spawn(&mut sim, "TraumaPatch").unwrap();
        let patient = sim.spawn_patient("Human", bloodstream(10.0, 0.0));
        let medic = sim.spawn_entity("Medic");
        sim.stick(patch, patient, medic);
        sim.unstick(patch);
        assert_eq!(sim.entities.count_prototype("UsedPatch"), 1);
    }
}
