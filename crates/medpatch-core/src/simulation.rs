//! Reference host: every collaborator in memory, wired to a [`PatchSystem`].
//!
//! Games embed [`PatchSystem`] against their own world. `Simulation` exists
//! so the engine can be driven end to end by tests, benchmarks and demos
//! without one.

use std::time::Duration;

use crate::attachment::{AttachmentEvent, StickyRelation};
use crate::container::SolutionStore;
use crate::context::PatchContext;
use crate::entity::{EntityDisposer, EntityStore};
use crate::event::EventBuffer;
use crate::fixed::Fixed64;
use crate::id::EntityId;
use crate::journal::{AuditTrail, PopupLog, ReactionLog};
use crate::lifecycle::LifecycleOutcome;
use crate::patch::{PatchError, PatchSpec};
use crate::scheduler::SweepReport;
use crate::sim::GameTiming;
use crate::solution::Solution;
use crate::system::PatchSystem;
use crate::transfer::{TransferConfig, TransferOutcome};

/// Name of a patient's injectable solution.
pub const BLOODSTREAM_SOLUTION: &str = "chemicals";

#[derive(Debug, Default)]
pub struct Simulation {
    pub timing: GameTiming,
    pub entities: EntityStore,
    pub solutions: SolutionStore,
    pub attachments: StickyRelation,
    pub reactions: ReactionLog,
    pub popups: PopupLog,
    pub audit: AuditTrail,
    pub events: EventBuffer,
    pub patches: PatchSystem,
}

impl Simulation {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            patches: PatchSystem::new(config),
            ..Self::default()
        }
    }

    /// Borrow the patch system, the clock and a context over everything else.
    fn split(&mut self) -> (&mut PatchSystem, &GameTiming, PatchContext<'_>) {
        let ctx = PatchContext {
            solutions: &mut self.solutions,
            attachments: &mut self.attachments,
            reactions: &mut self.reactions,
            notifications: &mut self.popups,
            audit: &mut self.audit,
            disposer: &mut self.entities,
            events: &mut self.events,
            tick: self.timing.tick(),
        };
        (&mut self.patches, &self.timing, ctx)
    }

    // -----------------------------------------------------------------------
    // Spawning
    // -----------------------------------------------------------------------

    pub fn spawn_entity(&mut self, prototype: impl Into<String>) -> EntityId {
        self.entities.spawn(prototype)
    }

    /// Spawn an entity with an injectable bloodstream.
    pub fn spawn_patient(&mut self, prototype: impl Into<String>, bloodstream: Solution) -> EntityId {
        let entity = self.entities.spawn(prototype);
        self.solutions
            .insert(entity, BLOODSTREAM_SOLUTION, bloodstream, true);
        entity
    }

    /// Spawn a patch entity pre-filled with `payload`.
    pub fn spawn_patch(
        &mut self,
        prototype: impl Into<String>,
        spec: PatchSpec,
        payload: Solution,
    ) -> Result<EntityId, PatchError> {
        spec.validate()?;
        let entity = self.entities.spawn(prototype);
        let solution_name = spec.solution_name.clone();
        if let Err(err) = self.patches.register(entity, spec) {
            self.entities.delete(entity);
            self.flush_deleted();
            return Err(err);
        }
        self.solutions.insert(entity, solution_name, payload, false);
        Ok(entity)
    }

    // -----------------------------------------------------------------------
    // Attachment
    // -----------------------------------------------------------------------

    /// Stick `patch` onto `target`. `None` if the relation refused.
    pub fn stick(
        &mut self,
        patch: EntityId,
        target: EntityId,
        user: EntityId,
    ) -> Option<LifecycleOutcome> {
        let event = self.attachments.stick(patch, target, user)?;
        Some(self.deliver(event))
    }

    /// Peel `patch` off. `None` if it was not stuck.
    pub fn unstick(&mut self, patch: EntityId) -> Option<LifecycleOutcome> {
        let event = self.attachments.unstick(patch)?;
        Some(self.deliver(event))
    }

    /// Deliver a notification to the patch system and settle deletions.
    pub fn deliver(&mut self, event: AttachmentEvent) -> LifecycleOutcome {
        let (system, _, mut ctx) = self.split();
        let outcome = system.handle(&mut ctx, event);
        self.flush_deleted();
        outcome
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Advance the clock by `dt` and run one sweep.
    pub fn step(&mut self, dt: Duration) -> SweepReport {
        self.timing.advance(dt);
        let (system, timing, mut ctx) = self.split();
        let report = system.update(&mut ctx, timing);
        self.flush_deleted();
        report
    }

    /// Out-of-cycle transfer from `patch`.
    pub fn try_inject(
        &mut self,
        patch: EntityId,
        amount: Fixed64,
    ) -> Result<TransferOutcome, PatchError> {
        let (system, _, mut ctx) = self.split();
        let outcome = system.try_inject(&mut ctx, patch, amount);
        self.flush_deleted();
        outcome
    }

    // -----------------------------------------------------------------------
    // Entity removal
    // -----------------------------------------------------------------------

    /// Delete an entity and everything that hangs off it. Patches stuck to
    /// a deleted target receive their detach notification first.
    pub fn delete_entity(&mut self, entity: EntityId) -> bool {
        let deleted = self.entities.delete(entity);
        self.flush_deleted();
        deleted
    }

    fn flush_deleted(&mut self) {
        loop {
            let deleted = self.entities.take_deleted();
            if deleted.is_empty() {
                break;
            }
            for entity in deleted {
                for event in self.attachments.forget(entity) {
                    let (system, _, mut ctx) = self.split();
                    system.handle(&mut ctx, event);
                }
                self.solutions.remove_owner(entity);
                self.patches.unregister(entity);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Volume of a named solution, zero when absent.
    pub fn volume(&self, entity: EntityId, name: &str) -> Fixed64 {
        self.solutions.volume_of(entity, name)
    }

    pub fn bloodstream_volume(&self, entity: EntityId) -> Fixed64 {
        self.volume(entity, BLOODSTREAM_SOLUTION)
    }

    /// Number of active patches.
    pub fn active_patches(&self) -> usize {
        self.patches.registry().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentRelation;
    use crate::lifecycle::Disposed;
    use crate::test_utils::*;

    #[test]
    fn spawn_patch_rejects_invalid_spec() {
        let mut sim = Simulation::default();
        let spec = PatchSpec {
            update_period: Duration::ZERO,
            ..PatchSpec::default()
        };
        let err = sim.spawn_patch("MedicalPatch", spec, payload(5.0));
        assert_eq!(err, Err(PatchError::ZeroUpdatePeriod));
        assert!(sim.entities.is_empty());
    }

    #[test]
    fn spawn_patch_fills_payload() {
        let mut sim = Simulation::default();
        let patch = sim
            .spawn_patch("MedicalPatch", PatchSpec::default(), payload(5.0))
            .unwrap();
        assert_eq!(sim.volume(patch, "drug"), fixed(5.0));
        assert_eq!(sim.active_patches(), 1);
    }

    #[test]
    fn try_inject_unknown_entity_is_error() {
        let mut sim = Simulation::default();
        let rock = sim.spawn_entity("Rock");
        assert_eq!(
            sim.try_inject(rock, fixed(1.0)),
            Err(PatchError::NotAPatch(rock))
        );
    }

    #[test]
    fn deleting_patient_detaches_and_consumes_single_use_patch() {
        let spec = PatchSpec {
            single_use: true,
            ..patch_spec(1.0, 1.0)
        };
        let mut w = ward(spec, 10.0, 30.0, 0.0);
        w.attach();
        assert!(w.sim.delete_entity(w.patient));
        assert!(!w.sim.entities.contains(w.patch));
        assert_eq!(w.sim.active_patches(), 0);
        assert!(w.sim.solutions.is_empty());
        assert!(w.sim.events.iter().any(|e| matches!(
            e,
            crate::event::PatchEvent::Consumed {
                disposed: Disposed::Deleted,
                ..
            }
        )));
    }

    #[test]
    fn deleting_attached_patch_cleans_up_relation() {
        let mut w = ward(patch_spec(1.0, 1.0), 10.0, 30.0, 0.0);
        w.attach();
        assert!(w.sim.delete_entity(w.patch));
        assert_eq!(w.sim.attachments.current_target(w.patch), None);
        assert_eq!(w.sim.active_patches(), 0);
        assert_eq!(w.payload_volume(), Fixed64::ZERO);
    }

    #[test]
    fn unstick_unattached_patch_is_none() {
        let mut w = ward(patch_spec(1.0, 1.0), 10.0, 30.0, 0.0);
        assert!(w.sim.unstick(w.patch).is_none());
    }
}
