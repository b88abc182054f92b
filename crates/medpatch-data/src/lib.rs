//! Medpatch Data -- patch prototypes and reagent lists from RON, TOML or JSON.
//!
//! [`load_patch_library`] reads a content directory and resolves it into a
//! [`PatchLibrary`] that can spawn patches into a
//! [`Simulation`](medpatch_core::simulation::Simulation).

pub mod loader;
pub mod prototypes;
pub mod schema;

pub use loader::{DataLoadError, load_patch_library};
pub use prototypes::{PatchLibrary, PatchPrototype, ReagentTable, SpawnError};
