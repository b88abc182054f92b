//! Patch lifecycle example: a bolus on attach, a steady drip, and disposal.
//!
//! Spawns a patient and a single-use patch that injects 5u on attach and
//! 2u every second after that. Runs the sweep until the patch is spent and
//! turns into a used patch, printing the state after each tick.
//!
//! Run with: `RUST_LOG=debug cargo run -p medpatch-core --example patch_lifecycle`

use std::time::Duration;

use medpatch_core::fixed::{Fixed64, fixed64_to_f64};
use medpatch_core::id::ReagentId;
use medpatch_core::patch::{Disposal, PatchSpec};
use medpatch_core::simulation::Simulation;
use medpatch_core::solution::Solution;
use medpatch_core::transfer::TransferConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut sim = Simulation::new(TransferConfig::default());
    sim.entities.register_prototype("UsedMedicalPatch");

    let bicaridine = ReagentId(0);

    // --- Step 1: Spawn the patient, the medic and the patch ---

    let patient = sim.spawn_patient("Human", Solution::new(Fixed64::from_num(100)));
    let medic = sim.spawn_entity("Medic");

    let spec = PatchSpec {
        transfer_amount: Fixed64::from_num(2),
        update_period: Duration::from_secs(1),
        single_use: true,
        inject_on_attach_amount: Fixed64::from_num(5),
        disposal: Disposal::TransformToUsed {
            prototype: "UsedMedicalPatch".to_string(),
        },
        ..PatchSpec::default()
    };
    let payload = Solution::new(Fixed64::from_num(15)).with_reagent(bicaridine, Fixed64::from_num(15));
    let patch = match sim.spawn_patch("MedicalPatch", spec, payload) {
        Ok(patch) => patch,
        Err(err) => {
            eprintln!("invalid patch: {err}");
            return;
        }
    };

    // --- Step 2: Stick it on ---

    let outcome = sim.stick(patch, patient, medic);
    println!("attach: {outcome:?}");
    for entry in &sim.audit.entries {
        println!("audit: {entry}");
    }

    // --- Step 3: Tick until the patch is gone ---

    for tick in 1..=10 {
        let report = sim.step(Duration::from_secs(1));
        println!(
            "tick {tick:>2}: blood {:>5.2}u, patch {:>5.2}u, {report:?}",
            fixed64_to_f64(sim.bloodstream_volume(patient)),
            fixed64_to_f64(sim.volume(patch, "drug")),
        );
        if sim.active_patches() == 0 {
            break;
        }
    }

    // --- Step 4: Inspect the event log ---

    println!(
        "\nused patches on the floor: {}",
        sim.entities.count_prototype("UsedMedicalPatch")
    );
    for event in sim.events.iter() {
        println!("{:?}", event.kind());
    }
}
