//! The transfer engine: one bounded move from a patch into its target.
//!
//! [`TransferEngine::try_inject`] checks its preconditions in a fixed order,
//! clamps the requested amount to the target's headroom, splits that much
//! from the payload and hands it to the target. The result is a
//! [`TransferOutcome`] value; nothing here returns an error or panics.

use serde::{Deserialize, Serialize};

use crate::context::{PatchContext, ReactionMethod};
use crate::event::PatchEvent;
use crate::fixed::Fixed64;
use crate::id::{EntityId, SolutionId};
use crate::patch::Patch;
use crate::solution::Solution;

/// Message shown at the target when it has no headroom.
pub const DEFAULT_NO_ROOM_MESSAGE: &str = "No room to inject";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of one transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    /// This much moved from the payload into the target.
    Transferred(Fixed64),
    /// The target had no headroom (or refused the quantity). The patch
    /// stays on; this is not a failure.
    NoRoom,
    /// A precondition was unmet. Grounds for detachment.
    Failed(TransferFailure),
}

impl TransferOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TransferOutcome::Failed(_))
    }

    /// Quantity moved, zero unless `Transferred`.
    pub fn amount(&self) -> Fixed64 {
        match self {
            TransferOutcome::Transferred(amount) => *amount,
            _ => Fixed64::ZERO,
        }
    }
}

/// Which precondition stopped a transfer, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum TransferFailure {
    #[error("patch is not attached to anything")]
    NotAttached,
    #[error("patch has no payload solution")]
    MissingSource,
    #[error("patch payload is empty")]
    SourceEmpty,
    #[error("target has no injectable solution")]
    NoInjectableTarget,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do with a quantity the target refuses after it was split from
/// the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RejectionPolicy {
    /// Put the quantity back into the payload.
    #[default]
    Restore,
    /// Drop it. The payload loses the quantity.
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub rejection_policy: RejectionPolicy,
    pub no_room_message: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            rejection_policy: RejectionPolicy::default(),
            no_room_message: DEFAULT_NO_ROOM_MESSAGE.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferEngine {
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(config: TransferConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Try to move `amount` from `patch`'s payload into whatever it is
    /// attached to.
    ///
    /// Preconditions, in order: the patch is attached; its payload exists
    /// and is non-empty; the target has an injectable solution. Then the
    /// amount is clamped to the target's headroom. Zero headroom shows the
    /// no-room popup and leaves the payload untouched.
    pub fn try_inject(
        &self,
        ctx: &mut PatchContext<'_>,
        patch: &Patch,
        amount: Fixed64,
    ) -> TransferOutcome {
        let entity = patch.entity;

        let Some(target) = ctx.attachments.current_target(entity) else {
            return fail(ctx, entity, TransferFailure::NotAttached);
        };
        let Some(source) = ctx.solutions.solution(entity, &patch.spec.solution_name) else {
            return fail(ctx, entity, TransferFailure::MissingSource);
        };
        if ctx.solutions.get(source).is_none_or(Solution::is_empty) {
            return fail(ctx, entity, TransferFailure::SourceEmpty);
        }
        let Some(dest) = ctx.solutions.injectable_solution(target) else {
            return fail(ctx, entity, TransferFailure::NoInjectableTarget);
        };

        let available = ctx
            .solutions
            .get(dest)
            .map(Solution::available_volume)
            .unwrap_or(Fixed64::ZERO);
        let real_amount = amount.min(available);
        if real_amount <= Fixed64::ZERO {
            tracing::debug!(patch = ?entity, ?target, "no room to inject");
            ctx.notifications.popup(target, &self.config.no_room_message);
            ctx.events.push(PatchEvent::NoRoom {
                patch: entity,
                target,
                tick: ctx.tick,
            });
            return TransferOutcome::NoRoom;
        }

        let removed = ctx.solutions.split(source, real_amount);
        if !ctx.solutions.can_add(dest, &removed) {
            return self.reject(ctx, entity, target, source, removed);
        }

        ctx.reactions
            .apply_reaction(target, &removed, ReactionMethod::Injection);
        let moved = removed.volume();
        // The reaction may have changed the target, so the add can still fail.
        if let Err(removed) = ctx.solutions.try_add(dest, removed) {
            return self.reject(ctx, entity, target, source, removed);
        }

        tracing::debug!(patch = ?entity, ?target, amount = %moved, "injected");
        ctx.events.push(PatchEvent::Injected {
            patch: entity,
            target,
            amount: moved,
            tick: ctx.tick,
        });
        TransferOutcome::Transferred(moved)
    }

    fn reject(
        &self,
        ctx: &mut PatchContext<'_>,
        patch: EntityId,
        target: EntityId,
        source: SolutionId,
        removed: Solution,
    ) -> TransferOutcome {
        let amount = removed.volume();
        let restored = match self.config.rejection_policy {
            RejectionPolicy::Restore => ctx.solutions.try_add(source, removed).is_ok(),
            RejectionPolicy::Discard => false,
        };
        tracing::warn!(
            ?patch,
            ?target,
            %amount,
            restored,
            "target rejected injected solution"
        );
        ctx.events.push(PatchEvent::TransferRejected {
            patch,
            target,
            amount,
            restored,
            tick: ctx.tick,
        });
        TransferOutcome::NoRoom
    }
}

fn fail(ctx: &mut PatchContext<'_>, patch: EntityId, reason: TransferFailure) -> TransferOutcome {
    tracing::debug!(?patch, %reason, "transfer precondition unmet");
    ctx.events.push(PatchEvent::TransferFailed {
        patch,
        reason,
        tick: ctx.tick,
    });
    TransferOutcome::Failed(reason)
}
