//! Attach/detach state machine.
//!
//! Two states, driven only by [`AttachmentEvent`]s:
//!
//! - `Unattached -> Attached`: audit the application, then run the optional
//!   boluses (absolute amount first, then percentage of what is left).
//! - `Attached -> Unattached`: single-use patches leave the registry and are
//!   disposed of.
//!
//! Notifications that do not fit the current state are ignored.

use serde::{Deserialize, Serialize};

use crate::attachment::AttachmentEvent;
use crate::context::{AuditEntry, PatchContext};
use crate::event::PatchEvent;
use crate::fixed::{Fixed64, percent_of};
use crate::id::EntityId;
use crate::patch::{AttachState, Disposal};
use crate::registry::PatchRegistry;
use crate::solution::Solution;
use crate::transfer::{TransferEngine, TransferOutcome};

/// How a consumed patch left the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposed {
    /// Replaced by an inert entity.
    Transformed { into: EntityId },
    Deleted,
    /// The entity was already gone when disposal ran.
    AlreadyGone,
}

/// What handling one notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Attached {
        /// Bolus transfers in the order they ran.
        boluses: Vec<TransferOutcome>,
    },
    Detached {
        /// `Some` when a single-use patch was consumed.
        disposed: Option<Disposed>,
    },
    /// Unknown patch, or a notification that does not match its state.
    Ignored,
}

/// Route one notification to its transition.
pub fn dispatch(
    registry: &mut PatchRegistry,
    transfer: &TransferEngine,
    ctx: &mut PatchContext<'_>,
    event: AttachmentEvent,
) -> LifecycleOutcome {
    match event {
        AttachmentEvent::Attached {
            patch,
            target,
            user,
        } => on_attached(registry, transfer, ctx, patch, target, user),
        AttachmentEvent::Detached { patch, target } => on_detached(registry, ctx, patch, target),
    }
}

pub fn on_attached(
    registry: &mut PatchRegistry,
    transfer: &TransferEngine,
    ctx: &mut PatchContext<'_>,
    patch: EntityId,
    target: EntityId,
    user: EntityId,
) -> LifecycleOutcome {
    let Some(id) = registry.id_of(patch) else {
        tracing::debug!(?patch, "attach notification for unknown patch");
        return LifecycleOutcome::Ignored;
    };
    let Some(state) = registry.get_mut(id).map(|p| &mut p.state) else {
        return LifecycleOutcome::Ignored;
    };
    if *state == AttachState::Attached {
        tracing::debug!(?patch, "patch already attached");
        return LifecycleOutcome::Ignored;
    }
    *state = AttachState::Attached;
    ctx.events.push(PatchEvent::Attached {
        patch,
        target,
        user,
        tick: ctx.tick,
    });

    let Some(current) = registry.get(id) else {
        return LifecycleOutcome::Ignored;
    };
    let spec = &current.spec;
    let mut boluses = Vec::new();

    let Some(source) = ctx.solutions.solution(patch, &spec.solution_name) else {
        return LifecycleOutcome::Attached { boluses };
    };
    let snapshot = ctx.solutions.get(source).cloned().unwrap_or_default();
    ctx.audit.record(AuditEntry {
        actor: user,
        target,
        device: patch,
        solution: snapshot,
        tick: ctx.tick,
    });

    if spec.inject_on_attach_amount > Fixed64::ZERO {
        let outcome = transfer.try_inject(ctx, current, spec.inject_on_attach_amount);
        boluses.push(outcome);
        if outcome.is_failed() {
            return LifecycleOutcome::Attached { boluses };
        }
    }

    if spec.inject_on_attach_percent > Fixed64::ZERO {
        let volume = ctx
            .solutions
            .solution(patch, &spec.solution_name)
            .and_then(|h| ctx.solutions.get(h))
            .map(Solution::volume)
            .unwrap_or(Fixed64::ZERO);
        if volume == Fixed64::ZERO {
            return LifecycleOutcome::Attached { boluses };
        }
        let amount = percent_of(volume, spec.inject_on_attach_percent);
        boluses.push(transfer.try_inject(ctx, current, amount));
    }

    LifecycleOutcome::Attached { boluses }
}

pub fn on_detached(
    registry: &mut PatchRegistry,
    ctx: &mut PatchContext<'_>,
    patch: EntityId,
    target: EntityId,
) -> LifecycleOutcome {
    let Some(id) = registry.id_of(patch) else {
        tracing::debug!(?patch, "detach notification for unknown patch");
        return LifecycleOutcome::Ignored;
    };
    let Some(current) = registry.get_mut(id) else {
        return LifecycleOutcome::Ignored;
    };
    if current.state != AttachState::Attached {
        tracing::debug!(?patch, "detach notification while unattached");
        return LifecycleOutcome::Ignored;
    }
    current.state = AttachState::Unattached;
    ctx.events.push(PatchEvent::Detached {
        patch,
        target,
        tick: ctx.tick,
    });

    if !current.spec.single_use {
        return LifecycleOutcome::Detached { disposed: None };
    }
    let Some(consumed) = registry.remove(id) else {
        return LifecycleOutcome::Detached { disposed: None };
    };
    let disposed = dispose(ctx, patch, &consumed.spec.disposal);
    tracing::info!(?patch, ?disposed, "single-use patch consumed");
    ctx.events.push(PatchEvent::Consumed {
        patch,
        disposed,
        tick: ctx.tick,
    });
    LifecycleOutcome::Detached {
        disposed: Some(disposed),
    }
}

fn dispose(ctx: &mut PatchContext<'_>, patch: EntityId, disposal: &Disposal) -> Disposed {
    match disposal {
        Disposal::TransformToUsed { prototype } => match ctx.disposer.transform(patch, prototype) {
            Ok(into) => Disposed::Transformed { into },
            Err(err) => {
                tracing::warn!(?patch, %err, "transform failed, deleting patch instead");
                delete(ctx, patch)
            }
        },
        Disposal::Delete => delete(ctx, patch),
    }
}

fn delete(ctx: &mut PatchContext<'_>, patch: EntityId) -> Disposed {
    if ctx.disposer.delete(patch) {
        Disposed::Deleted
    } else {
        Disposed::AlreadyGone
    }
}
