//! Integration test: Burn Ward (TOML content, custom transfer config)
//!
//! `data/burn_ward` has no reagent list, so reagent names are registered on
//! first use. Its `transfer.toml` switches rejections to `Discard` and
//! overrides the no-room popup.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use medpatch_core::container::{ReagentFilter, SolutionContainers};
use medpatch_core::event::{PatchEvent, PatchEventKind};
use medpatch_core::fixed::Fixed64;
use medpatch_core::id::ReagentId;
use medpatch_core::simulation::BLOODSTREAM_SOLUTION;
use medpatch_core::solution::Solution;
use medpatch_core::transfer::RejectionPolicy;
use medpatch_data::load_patch_library;

fn content_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/burn_ward")
}

fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

#[test]
fn burn_content_loads_with_config() {
    let library = load_patch_library(&content_dir()).unwrap();
    assert_eq!(library.config.rejection_policy, RejectionPolicy::Discard);
    assert_eq!(library.config.no_room_message, "The burn is already saturated");
    assert_eq!(library.reagents.id("kelotane"), Some(ReagentId(0)));

    let burn = library.get("BurnPatch").unwrap();
    assert_eq!(burn.spec.solution_name, "gel");
    assert_eq!(burn.spec.update_period, Duration::from_millis(500));
    assert_eq!(burn.payload.volume(), fixed(15.0));
    assert_eq!(burn.payload.max_volume(), fixed(30.0));
}

#[test]
fn burn_patch_fills_patient_then_reports_saturation() {
    let library = load_patch_library(&content_dir()).unwrap();
    let mut sim = library.simulation();
    let patient = sim.spawn_patient("Human", Solution::new(fixed(12.0)));
    let medic = sim.spawn_entity("Medic");
    let patch = library.spawn(&mut sim, "BurnPatch").unwrap();
    sim.stick(patch, patient, medic);

    // 5 + 5 + 2 (headroom), then nothing fits.
    let mut moved = Vec::new();
    for _ in 0..4 {
        sim.step(Duration::from_millis(500));
        moved.push(sim.bloodstream_volume(patient));
    }
    assert_eq!(moved, vec![fixed(5.0), fixed(10.0), fixed(12.0), fixed(12.0)]);
    assert_eq!(sim.volume(patch, "gel"), fixed(3.0));

    let popups: Vec<_> = sim.popups.for_target(patient).collect();
    assert_eq!(popups.len(), 1);
    assert_eq!(popups[0].message, "The burn is already saturated");
    assert_eq!(sim.events.count(PatchEventKind::NoRoom), 1);
}

#[test]
fn rejected_gel_is_lost_under_discard() {
    let library = load_patch_library(&content_dir()).unwrap();
    let mut sim = library.simulation();
    let patient = sim.spawn_patient("Human", Solution::new(fixed(50.0)));
    let medic = sim.spawn_entity("Medic");
    let patch = library.spawn(&mut sim, "BurnPatch").unwrap();

    // The patient's blood only accepts a reagent the patch does not carry.
    let blood = sim
        .solutions
        .solution(patient, BLOODSTREAM_SOLUTION)
        .unwrap();
    let only_other: BTreeSet<_> = [ReagentId(42)].into_iter().collect();
    sim.solutions
        .set_filter(blood, ReagentFilter::Only(only_other));

    sim.stick(patch, patient, medic);
    let report = sim.step(Duration::from_millis(500));

    assert_eq!(report.no_room, 1);
    assert_eq!(report.detach_requests, 0);
    assert_eq!(sim.bloodstream_volume(patient), Fixed64::ZERO);
    assert_eq!(sim.volume(patch, "gel"), fixed(10.0));
    assert!(sim.popups.popups.is_empty());
    assert!(sim.events.iter().any(|e| matches!(
        e,
        PatchEvent::TransferRejected { restored: false, .. }
    )));
}
