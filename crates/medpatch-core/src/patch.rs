//! Patch component data.
//!
//! A [`PatchSpec`] is the authored configuration; a [`Patch`] is one live
//! instance bound to an entity, carrying its cooldown and attach state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;
use crate::id::EntityId;

/// Name of the payload solution when a prototype does not override it.
pub const DEFAULT_SOLUTION_NAME: &str = "drug";

/// What happens to a single-use patch once it comes off.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Disposal {
    /// Replace the patch with an inert entity of the given prototype.
    /// Falls back to [`Disposal::Delete`] if the transform fails.
    TransformToUsed { prototype: String },
    /// Remove the entity outright.
    #[default]
    Delete,
}

/// Attach state of a patch as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttachState {
    #[default]
    Unattached,
    Attached,
}

/// Authored patch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    /// Which of the patch entity's solutions holds the payload.
    pub solution_name: String,
    /// Quantity moved per cycle.
    pub transfer_amount: Fixed64,
    /// Time between cycles.
    pub update_period: Duration,
    /// Consumed when it comes off.
    pub single_use: bool,
    /// Immediate transfer on attach, as an absolute quantity.
    pub inject_on_attach_amount: Fixed64,
    /// Immediate transfer on attach, as a percentage (0..=100) of the
    /// payload's current volume.
    pub inject_on_attach_percent: Fixed64,
    pub disposal: Disposal,
}

impl Default for PatchSpec {
    fn default() -> Self {
        Self {
            solution_name: DEFAULT_SOLUTION_NAME.to_string(),
            transfer_amount: Fixed64::from_num(1),
            update_period: Duration::from_secs(1),
            single_use: false,
            inject_on_attach_amount: Fixed64::ZERO,
            inject_on_attach_percent: Fixed64::ZERO,
            disposal: Disposal::Delete,
        }
    }
}

impl PatchSpec {
    /// Check the invariants a patch must hold before it is registered.
    pub fn validate(&self) -> Result<(), PatchError> {
        if self.solution_name.is_empty() {
            return Err(PatchError::EmptySolutionName);
        }
        if self.transfer_amount < Fixed64::ZERO {
            return Err(PatchError::NegativeAmount {
                field: "transfer_amount",
                value: self.transfer_amount,
            });
        }
        if self.inject_on_attach_amount < Fixed64::ZERO {
            return Err(PatchError::NegativeAmount {
                field: "inject_on_attach_amount",
                value: self.inject_on_attach_amount,
            });
        }
        if self.inject_on_attach_percent < Fixed64::ZERO
            || self.inject_on_attach_percent > Fixed64::from_num(100)
        {
            return Err(PatchError::PercentOutOfRange(self.inject_on_attach_percent));
        }
        if self.update_period.is_zero() {
            return Err(PatchError::ZeroUpdatePeriod);
        }
        if let Disposal::TransformToUsed { prototype } = &self.disposal
            && prototype.is_empty()
        {
            return Err(PatchError::EmptyDisposalPrototype);
        }
        Ok(())
    }
}

/// A live patch bound to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub entity: EntityId,
    pub spec: PatchSpec,
    /// Earliest simulation time of the next cycle. Only the scheduler moves
    /// it, and only forwards.
    pub(crate) next_update_at: Duration,
    pub(crate) state: AttachState,
}

impl Patch {
    /// Create a patch that is due immediately once attached.
    pub fn new(entity: EntityId, spec: PatchSpec) -> Result<Self, PatchError> {
        spec.validate()?;
        Ok(Self {
            entity,
            spec,
            next_update_at: Duration::ZERO,
            state: AttachState::Unattached,
        })
    }

    pub fn next_update_at(&self) -> Duration {
        self.next_update_at
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    /// Whether a cycle may run at `now`.
    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.next_update_at
    }

    /// Push the cooldown to `now + update_period`. Never moves it back.
    pub(crate) fn advance_cooldown(&mut self, now: Duration) {
        let next = now.saturating_add(self.spec.update_period);
        if next > self.next_update_at {
            self.next_update_at = next;
        }
    }
}

/// Errors raised when building or looking up patches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("patch solution name must not be empty")]
    EmptySolutionName,
    #[error("{field} must be non-negative, got {value}")]
    NegativeAmount { field: &'static str, value: Fixed64 },
    #[error("inject_on_attach_percent must be within 0..=100, got {0}")]
    PercentOutOfRange(Fixed64),
    #[error("update period must be greater than zero")]
    ZeroUpdatePeriod,
    #[error("transform-to-used disposal needs a prototype name")]
    EmptyDisposalPrototype,
    #[error("entity {0:?} already carries a patch")]
    AlreadyRegistered(EntityId),
    #[error("entity {0:?} is not a patch")]
    NotAPatch(EntityId),
}
