//! Serde data file structs for patch content definitions.
//!
//! These structs define the on-disk format for reagents and patch prototypes.
//! They are deserialized from RON, JSON, or TOML data files and then resolved
//! into engine types by the loader.

use serde::Deserialize;

// ===========================================================================
// Reagents
// ===========================================================================

/// A reagent definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReagentData {
    pub name: String,
}

// ===========================================================================
// Patches
// ===========================================================================

/// One payload entry, supporting both short tuple form and full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PayloadEntryData {
    /// Short form: `("bicaridine", 10.0)`.
    Short(String, f64),
    /// Full form with explicit fields.
    Full { reagent: String, quantity: f64 },
}

impl PayloadEntryData {
    pub fn reagent(&self) -> &str {
        match self {
            PayloadEntryData::Short(name, _) => name,
            PayloadEntryData::Full { reagent, .. } => reagent,
        }
    }

    pub fn quantity(&self) -> f64 {
        match self {
            PayloadEntryData::Short(_, q) => *q,
            PayloadEntryData::Full { quantity, .. } => *quantity,
        }
    }
}

/// What a single-use patch turns into once it comes off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposalData {
    #[default]
    Delete,
    TransformToUsed { prototype: String },
}

fn default_solution_name() -> String {
    medpatch_core::patch::DEFAULT_SOLUTION_NAME.to_string()
}

fn default_one() -> f64 {
    1.0
}

/// A patch prototype definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchPrototypeData {
    pub name: String,
    #[serde(default = "default_solution_name")]
    pub solution_name: String,
    /// Payload capacity. Defaults to the sum of the payload entries.
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub payload: Vec<PayloadEntryData>,
    #[serde(default = "default_one")]
    pub transfer_amount: f64,
    /// Seconds between transfer cycles.
    #[serde(default = "default_one")]
    pub update_period: f64,
    #[serde(default)]
    pub single_use: bool,
    #[serde(default)]
    pub inject_on_attach_amount: f64,
    #[serde(default)]
    pub inject_on_attach_percent: f64,
    #[serde(default)]
    pub disposal: DisposalData,
}

// ===========================================================================
// TOML wrappers
// ===========================================================================

/// Wrapper for a list of reagents in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlReagents {
    pub reagents: Vec<ReagentData>,
}

/// Wrapper for a list of patch prototypes in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlPatches {
    pub patches: Vec<PatchPrototypeData>,
}
