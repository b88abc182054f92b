//! The patch system: registry plus the entry points a host calls.

use crate::attachment::AttachmentEvent;
use crate::context::PatchContext;
use crate::fixed::Fixed64;
use crate::id::{EntityId, PatchId};
use crate::lifecycle::{self, LifecycleOutcome};
use crate::patch::{Patch, PatchError, PatchSpec};
use crate::registry::PatchRegistry;
use crate::scheduler::{self, SweepReport};
use crate::sim::GameTiming;
use crate::transfer::{TransferConfig, TransferEngine, TransferOutcome};

/// Owns the active patches and drives them.
///
/// Hosts call [`update`](Self::update) once per tick and forward every
/// attachment notification to [`handle`](Self::handle).
#[derive(Debug, Clone, Default)]
pub struct PatchSystem {
    registry: PatchRegistry,
    transfer: TransferEngine,
}

impl PatchSystem {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            registry: PatchRegistry::new(),
            transfer: TransferEngine::new(config),
        }
    }

    pub fn registry(&self) -> &PatchRegistry {
        &self.registry
    }

    pub fn transfer(&self) -> &TransferEngine {
        &self.transfer
    }

    /// Start tracking `entity` as a patch.
    pub fn register(&mut self, entity: EntityId, spec: PatchSpec) -> Result<PatchId, PatchError> {
        let patch = Patch::new(entity, spec)?;
        self.registry.insert(patch)
    }

    /// Stop tracking `entity`. No disposal runs.
    pub fn unregister(&mut self, entity: EntityId) -> Option<Patch> {
        self.registry.remove_entity(entity)
    }

    /// One scheduler sweep.
    pub fn update(&mut self, ctx: &mut PatchContext<'_>, timing: &GameTiming) -> SweepReport {
        scheduler::sweep(&mut self.registry, &self.transfer, ctx, timing)
    }

    /// Deliver an attachment notification.
    pub fn handle(&mut self, ctx: &mut PatchContext<'_>, event: AttachmentEvent) -> LifecycleOutcome {
        lifecycle::dispatch(&mut self.registry, &self.transfer, ctx, event)
    }

    /// Out-of-cycle transfer, e.g. a player squeezing the patch. Does not
    /// touch the cooldown.
    pub fn try_inject(
        &self,
        ctx: &mut PatchContext<'_>,
        entity: EntityId,
        amount: Fixed64,
    ) -> Result<TransferOutcome, PatchError> {
        let patch = self
            .registry
            .by_entity(entity)
            .ok_or(PatchError::NotAPatch(entity))?;
        Ok(self.transfer.try_inject(ctx, patch, amount))
    }
}
