//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use std::time::Duration;

use crate::attachment::AttachmentRelation;
use crate::fixed::Fixed64;
use crate::id::{EntityId, ReagentId};
use crate::lifecycle::LifecycleOutcome;
use crate::patch::PatchSpec;
use crate::simulation::{BLOODSTREAM_SOLUTION, Simulation};
use crate::solution::Solution;
use crate::transfer::TransferConfig;

// ===========================================================================
// Fixed-point and time helpers
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

// ===========================================================================
// Reagents
// ===========================================================================

pub fn bicaridine() -> ReagentId {
    ReagentId(0)
}
pub fn kelotane() -> ReagentId {
    ReagentId(1)
}
pub fn dexalin() -> ReagentId {
    ReagentId(2)
}
/// Whatever is already in a patient's blood.
pub fn blood() -> ReagentId {
    ReagentId(9)
}

// ===========================================================================
// Solutions and specs
// ===========================================================================

/// A full patch payload of bicaridine.
pub fn payload(volume: f64) -> Solution {
    Solution::new(fixed(volume)).with_reagent(bicaridine(), fixed(volume))
}

/// A bloodstream of `capacity` units already holding `filled` units.
pub fn bloodstream(capacity: f64, filled: f64) -> Solution {
    Solution::new(fixed(capacity)).with_reagent(blood(), fixed(filled))
}

/// A reusable patch moving `amount` every `period_secs`.
pub fn patch_spec(amount: f64, period_secs: f64) -> PatchSpec {
    PatchSpec {
        transfer_amount: fixed(amount),
        update_period: Duration::from_secs_f64(period_secs),
        ..PatchSpec::default()
    }
}

// ===========================================================================
// Ward: one patch, one patient, one medic
// ===========================================================================

pub struct Ward {
    pub sim: Simulation,
    pub patch: EntityId,
    pub patient: EntityId,
    pub user: EntityId,
}

impl Ward {
    /// Stick the patch on the patient.
    pub fn attach(&mut self) -> Option<LifecycleOutcome> {
        self.sim.stick(self.patch, self.patient, self.user)
    }

    /// Peel the patch off whatever it is stuck to.
    pub fn detach(&mut self) -> Option<LifecycleOutcome> {
        self.sim.unstick(self.patch)
    }

    pub fn is_attached(&self) -> bool {
        self.sim.attachments.current_target(self.patch).is_some()
    }

    /// Volume left in the patch payload.
    pub fn payload_volume(&self) -> Fixed64 {
        let name = self
            .sim
            .patches
            .registry()
            .by_entity(self.patch)
            .map(|p| p.spec.solution_name.as_str())
            .unwrap_or(crate::patch::DEFAULT_SOLUTION_NAME);
        self.sim.volume(self.patch, name)
    }

    /// Total volume in the patient's bloodstream.
    pub fn blood_volume(&self) -> Fixed64 {
        self.sim.volume(self.patient, BLOODSTREAM_SOLUTION)
    }

    pub fn next_update_at(&self) -> Duration {
        self.sim
            .patches
            .registry()
            .by_entity(self.patch)
            .map(|p| p.next_update_at())
            .unwrap_or(Duration::ZERO)
    }
}

/// Build a ward with the default transfer config.
pub fn ward(spec: PatchSpec, payload_volume: f64, blood_capacity: f64, blood_filled: f64) -> Ward {
    ward_with_config(
        TransferConfig::default(),
        spec,
        payload_volume,
        blood_capacity,
        blood_filled,
    )
}

pub fn ward_with_config(
    config: TransferConfig,
    spec: PatchSpec,
    payload_volume: f64,
    blood_capacity: f64,
    blood_filled: f64,
) -> Ward {
    let mut sim = Simulation::new(config);
    let patient = sim.spawn_patient("Human", bloodstream(blood_capacity, blood_filled));
    let user = sim.spawn_entity("Medic");
    let patch = sim
        .spawn_patch("MedicalPatch", spec, payload(payload_volume))
        .expect("valid test spec");
    Ward {
        sim,
        patch,
        patient,
        user,
    }
}
