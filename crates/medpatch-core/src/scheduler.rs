//! Periodic patch scheduler.
//!
//! One [`sweep`] per simulation tick. For each registered patch:
//!
//! 1. Skip if its cooldown has not elapsed.
//! 2. Skip if it is not attached to anything.
//! 3. Push the cooldown to `now + update_period`, whatever happens next.
//! 4. Run one transfer for `transfer_amount`.
//! 5. On a failed precondition, ask the relation to detach the patch and
//!    deliver the resulting notification immediately.
//!
//! Ids are snapshotted before the walk, so a patch consumed mid-sweep is
//! simply skipped and no patch is visited twice.

use std::time::Duration;

use crate::context::PatchContext;
use crate::event::PatchEvent;
use crate::id::EntityId;
use crate::lifecycle::{self, LifecycleOutcome};
use crate::registry::PatchRegistry;
use crate::sim::GameTiming;
use crate::transfer::{TransferEngine, TransferOutcome};

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// True when the tick was a replayed prediction and nothing ran.
    pub skipped_prediction: bool,
    /// Patches whose cooldown elapsed while attached.
    pub visited: u32,
    pub transferred: u32,
    pub no_room: u32,
    pub failed: u32,
    pub detach_requests: u32,
    /// Single-use patches consumed as a result of a detach request.
    pub consumed: u32,
}

/// Run one scheduler pass over every active patch.
pub fn sweep(
    registry: &mut PatchRegistry,
    transfer: &TransferEngine,
    ctx: &mut PatchContext<'_>,
    timing: &GameTiming,
) -> SweepReport {
    let mut report = SweepReport::default();
    if !timing.is_first_time_predicted() {
        report.skipped_prediction = true;
        return report;
    }
    let now = timing.cur_time();

    for id in registry.ids() {
        let Some(patch) = registry.get_mut(id) else {
            continue;
        };
        if !patch.is_due(now) {
            continue;
        }
        let entity = patch.entity;
        let Some(target) = ctx.attachments.current_target(entity) else {
            continue;
        };
        patch.advance_cooldown(now);
        report.visited += 1;

        let amount = patch.spec.transfer_amount;
        match transfer.try_inject(ctx, patch, amount) {
            TransferOutcome::Transferred(_) => report.transferred += 1,
            TransferOutcome::NoRoom => report.no_room += 1,
            TransferOutcome::Failed(_) => {
                report.failed += 1;
                request_detach(registry, transfer, ctx, entity, target, &mut report);
            }
        }
    }

    report
}

fn request_detach(
    registry: &mut PatchRegistry,
    transfer: &TransferEngine,
    ctx: &mut PatchContext<'_>,
    patch: EntityId,
    target: EntityId,
    report: &mut SweepReport,
) {
    report.detach_requests += 1;
    let response = ctx.attachments.request_detach(patch, target);
    ctx.events.push(PatchEvent::DetachRequested {
        patch,
        target,
        accepted: response.is_some(),
        tick: ctx.tick,
    });
    let Some(notification) = response else {
        tracing::debug!(?patch, ?target, "detach request refused");
        return;
    };
    tracing::debug!(?patch, ?target, "detaching spent patch");
    if let LifecycleOutcome::Detached {
        disposed: Some(_),
    } = lifecycle::dispatch(registry, transfer, ctx, notification)
    {
        report.consumed += 1;
    }
}

/// Time until the earliest registered patch becomes due, attached or not.
/// Hosts that sleep between ticks use this as a hint.
pub fn next_due(registry: &PatchRegistry, now: Duration) -> Option<Duration> {
    registry
        .iter()
        .map(|(_, p)| p.next_update_at().saturating_sub(now))
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentRelation;
    use crate::event::PatchEventKind;
    use crate::patch::PatchSpec;
    use crate::test_utils::*;

    #[test]
    fn transfers_on_first_tick_then_waits_for_cooldown() {
        let mut w = ward(patch_spec(2.0, 1.0), 10.0, 30.0, 0.0);
        w.attach();

        let report = w.sim.step(millis(100));
        assert_eq!(report.transferred, 1);
        assert_eq!(w.blood_volume(), fixed(2.0));
        assert_eq!(w.next_update_at(), millis(1100));

        // 0.2s .. 1.0s: still cooling down.
        for _ in 0..9 {
            let report = w.sim.step(millis(100));
            assert_eq!(report.visited, 0);
        }
        assert_eq!(w.blood_volume(), fixed(2.0));

        let report = w.sim.step(millis(100));
        assert_eq!(report.transferred, 1);
        assert_eq!(w.blood_volume(), fixed(4.0));
    }

    #[test]
    fn unattached_patch_is_not_visited() {
        let mut w = ward(patch_spec(2.0, 1.0), 10.0, 30.0, 0.0);
        let report = w.sim.step(millis(100));
        assert_eq!(report, SweepReport::default());
        assert_eq!(w.next_update_at(), Duration::ZERO);
        assert_eq!(w.payload_volume(), fixed(10.0));
    }

    #[test]
    fn cooldown_advances_even_on_no_room() {
        let mut w = ward(patch_spec(2.0, 1.0), 10.0, 5.0, 5.0);
        w.attach();
        let report = w.sim.step(millis(500));
        assert_eq!(report.no_room, 1);
        assert_eq!(w.next_update_at(), millis(1500));
        assert!(w.sim.attachments.current_target(w.patch).is_some());
    }

    #[test]
    fn empty_payload_requests_exactly_one_detach() {
        let mut w = ward(patch_spec(2.0, 1.0), 0.0, 30.0, 0.0);
        w.attach();
        let report = w.sim.step(millis(100));
        assert_eq!(report.failed, 1);
        assert_eq!(report.detach_requests, 1);
        assert_eq!(report.transferred, 0);
        assert_eq!(w.sim.attachments.current_target(w.patch), None);
        assert_eq!(w.sim.events.count(PatchEventKind::DetachRequested), 1);

        // Detached now, so later ticks do nothing.
        let report = w.sim.step(millis(2000));
        assert_eq!(report.visited, 0);
    }

    #[test]
    fn refused_detach_keeps_patch_on_and_retries_next_cycle() {
        let mut w = ward(patch_spec(2.0, 1.0), 0.0, 30.0, 0.0);
        w.attach();
        w.sim.attachments.set_locked(w.patch, true);

        let report = w.sim.step(millis(100));
        assert_eq!(report.detach_requests, 1);
        assert!(w.sim.attachments.current_target(w.patch).is_some());

        let report = w.sim.step(millis(100));
        assert_eq!(report.detach_requests, 0);

        let report = w.sim.step(millis(1000));
        assert_eq!(report.detach_requests, 1);
    }

    #[test]
    fn spent_single_use_patch_is_consumed_by_sweep() {
        let spec = PatchSpec {
            single_use: true,
            ..patch_spec(5.0, 1.0)
        };
        let mut w = ward(spec, 5.0, 30.0, 0.0);
        w.attach();

        let report = w.sim.step(millis(100));
        assert_eq!(report.transferred, 1);

        let report = w.sim.step(millis(1000));
        assert_eq!(report.failed, 1);
        assert_eq!(report.consumed, 1);
        assert!(!w.sim.entities.contains(w.patch));
        assert!(w.sim.patches.registry().is_empty());
        assert_eq!(w.blood_volume(), fixed(5.0));
    }

    #[test]
    fn replayed_prediction_is_skipped() {
        let mut w = ward(patch_spec(2.0, 1.0), 10.0, 30.0, 0.0);
        w.attach();
        w.sim.timing.set_first_time_predicted(false);
        let report = w.sim.step(millis(100));
        assert!(report.skipped_prediction);
        assert_eq!(w.payload_volume(), fixed(10.0));
        assert_eq!(w.next_update_at(), Duration::ZERO);
    }

    #[test]
    fn independent_patches_on_one_patient() {
        let mut w = ward(patch_spec(1.0, 1.0), 10.0, 30.0, 0.0);
        w.attach();
        let second = w
            .sim
            .spawn_patch("MedicalPatch", patch_spec(3.0, 2.0), payload(9.0))
            .unwrap();
        w.sim.stick(second, w.patient, w.user);

        let report = w.sim.step(millis(100));
        assert_eq!(report.visited, 2);
        assert_eq!(w.blood_volume(), fixed(4.0));

        w.sim.step(millis(1000));
        // Only the 1s patch was due again.
        assert_eq!(w.blood_volume(), fixed(5.0));
        assert_eq!(w.sim.volume(second, "drug"), fixed(6.0));
    }

    #[test]
    fn next_due_reports_shortest_wait() {
        let mut w = ward(patch_spec(1.0, 3.0), 10.0, 30.0, 0.0);
        assert_eq!(
            next_due(w.sim.patches.registry(), Duration::ZERO),
            Some(Duration::ZERO)
        );
        w.attach();
        w.sim.step(millis(500));
        assert_eq!(
            next_due(w.sim.patches.registry(), w.sim.timing.cur_time()),
            Some(Duration::from_secs(3))
        );
        assert!(next_due(&PatchRegistry::new(), Duration::ZERO).is_none());
    }
}
