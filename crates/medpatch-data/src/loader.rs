//! Loading pipeline: finds content files, parses them, resolves names.
//!
//! A content directory holds:
//!
//! - `patches.{ron,toml,json}` (required): the patch prototypes.
//! - `reagents.{ron,toml,json}` (optional): the reagent list. Without it,
//!   reagent names are registered in order of first appearance.
//! - `transfer.{ron,toml,json}` (optional): a [`TransferConfig`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use medpatch_core::fixed::Fixed64;
use medpatch_core::patch::{Disposal, PatchSpec};
use medpatch_core::solution::Solution;
use medpatch_core::transfer::TransferConfig;
use serde::de::DeserializeOwned;

use crate::prototypes::{PatchLibrary, PatchPrototype, ReagentTable};
use crate::schema::{DisposalData, PatchPrototypeData, ReagentData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during content loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A prototype parsed but does not describe a valid patch.
    #[error("invalid patch prototype '{name}' in {file}: {detail}")]
    InvalidPrototype {
        file: PathBuf,
        name: String,
        detail: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

const EXTENSIONS: [(&str, Format); 3] = [
    ("ron", Format::Ron),
    ("toml", Format::Toml),
    ("json", Format::Json),
];

/// Detect the format of a file from its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    EXTENSIONS
        .iter()
        .find(|(name, _)| Some(*name) == ext)
        .map(|(_, format)| *format)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`.
///
/// Returns `Ok(None)` if none exists and `ConflictingFormats` if more than
/// one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for (ext, _) in EXTENSIONS {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. RON and JSON files hold the list directly; TOML files
/// hold it as an array of tables under `toml_key`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let content = std::fs::read_to_string(path)?;
    let mut table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name, returning `UnresolvedRef` if it is absent.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Fail with `DuplicateName` if `name` is already taken.
pub fn check_duplicate(taken: bool, name: &str, file: &Path) -> Result<(), DataLoadError> {
    if taken {
        return Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(())
}

// ===========================================================================
// Pipeline
// ===========================================================================

/// Load every content file in `dir` into a [`PatchLibrary`].
pub fn load_patch_library(dir: &Path) -> Result<PatchLibrary, DataLoadError> {
    let (mut reagents, reagents_declared) = match find_data_file(dir, "reagents")? {
        Some(path) => (load_reagents(&path)?, true),
        None => (ReagentTable::new(), false),
    };

    let config = match find_data_file(dir, "transfer")? {
        Some(path) => deserialize_file::<TransferConfig>(&path)?,
        None => TransferConfig::default(),
    };

    let patches_path = require_data_file(dir, "patches")?;
    let data: Vec<PatchPrototypeData> = deserialize_list(&patches_path, "patches")?;

    let mut prototypes = Vec::with_capacity(data.len());
    let mut seen = HashSet::new();
    for entry in data {
        check_duplicate(!seen.insert(entry.name.clone()), &entry.name, &patches_path)?;
        let prototype = resolve_prototype(entry, &mut reagents, reagents_declared, &patches_path)?;
        prototypes.push(prototype);
    }

    let mut library = PatchLibrary::new(reagents, config);
    for prototype in prototypes {
        library.insert(prototype);
    }
    tracing::info!(
        dir = %dir.display(),
        patches = library.len(),
        reagents = library.reagents.len(),
        "loaded patch prototypes"
    );
    Ok(library)
}

fn load_reagents(path: &Path) -> Result<ReagentTable, DataLoadError> {
    let data: Vec<ReagentData> = deserialize_list(path, "reagents")?;
    let mut table = ReagentTable::new();
    for reagent in data {
        check_duplicate(table.id(&reagent.name).is_some(), &reagent.name, path)?;
        table.register(&reagent.name);
    }
    Ok(table)
}

fn resolve_prototype(
    data: PatchPrototypeData,
    reagents: &mut ReagentTable,
    reagents_declared: bool,
    file: &Path,
) -> Result<PatchPrototype, DataLoadError> {
    let invalid = |detail: String| DataLoadError::InvalidPrototype {
        file: file.to_path_buf(),
        name: data.name.clone(),
        detail,
    };
    let quantity = |field: &str, v: f64| {
        Fixed64::checked_from_num(v)
            .ok_or_else(|| invalid(format!("{field} {v} is not a representable quantity")))
    };

    let update_period = Duration::try_from_secs_f64(data.update_period)
        .map_err(|e| invalid(format!("update_period {}: {e}", data.update_period)))?;

    let mut contents = Vec::with_capacity(data.payload.len());
    let mut total = Fixed64::ZERO;
    for entry in &data.payload {
        let id = if reagents_declared {
            *resolve_name(reagents.names(), entry.reagent(), file, "reagent")?
        } else {
            reagents.register(entry.reagent())
        };
        let amount = quantity("payload quantity", entry.quantity())?;
        if amount < Fixed64::ZERO {
            return Err(invalid(format!(
                "negative payload quantity for '{}'",
                entry.reagent()
            )));
        }
        total = total.saturating_add(amount);
        contents.push((id, amount));
    }

    let capacity = match data.capacity {
        Some(c) => quantity("capacity", c)?,
        None => total,
    };
    if total > capacity {
        return Err(invalid(format!(
            "payload of {total} exceeds capacity {capacity}"
        )));
    }
    let mut payload = Solution::new(capacity);
    for (id, amount) in contents {
        payload.add_reagent(id, amount);
    }

    let spec = PatchSpec {
        solution_name: data.solution_name.clone(),
        transfer_amount: quantity("transfer_amount", data.transfer_amount)?,
        update_period,
        single_use: data.single_use,
        inject_on_attach_amount: quantity("inject_on_attach_amount", data.inject_on_attach_amount)?,
        inject_on_attach_percent: quantity(
            "inject_on_attach_percent",
            data.inject_on_attach_percent,
        )?,
        disposal: match &data.disposal {
            DisposalData::Delete => Disposal::Delete,
            DisposalData::TransformToUsed { prototype } => Disposal::TransformToUsed {
                prototype: prototype.clone(),
            },
        },
    };
    spec.validate().map_err(|e| invalid(e.to_string()))?;

    Ok(PatchPrototype {
        name: data.name.clone(),
        spec,
        payload,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use medpatch_core::id::ReagentId;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "medpatch_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("patches.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("patches.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("patches.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("patches.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("patches")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn find_data_file_variants() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "patches").unwrap(), None);

        fs::write(dir.join("patches.toml"), "").unwrap();
        assert_eq!(
            find_data_file(&dir, "patches").unwrap(),
            Some(dir.join("patches.toml"))
        );

        fs::write(dir.join("patches.json"), "[]").unwrap();
        assert!(matches!(
            find_data_file(&dir, "patches"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn missing_patches_file_is_error() {
        let dir = make_test_dir("missing_patches");
        let err = load_patch_library(&dir).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::MissingRequired { ref file, .. } if file == "patches"
        ));
        assert!(err.to_string().contains("patches"));
        cleanup(&dir);
    }

    #[test]
    fn toml_list_missing_key() {
        let dir = make_test_dir("toml_missing_key");
        let path = dir.join("patches.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();
        let result: Result<Vec<ReagentData>, _> = deserialize_list(&path, "patches");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
        cleanup(&dir);
    }

    #[test]
    fn parse_error_names_file() {
        let dir = make_test_dir("parse_err");
        fs::write(dir.join("patches.ron"), "this is not valid RON {{{").unwrap();
        let err = load_patch_library(&dir).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { .. }));
        assert!(err.to_string().contains("patches.ron"));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    #[test]
    fn load_ron_library_auto_registers_reagents() {
        let dir = make_test_dir("load_ron");
        fs::write(
            dir.join("patches.ron"),
            r#"[
                (
                    name: "BrutePatch",
                    payload: [("bicaridine", 10.0)],
                    transfer_amount: 2.0,
                    update_period: 0.5,
                ),
                (
                    name: "MixedPatch",
                    payload: [("kelotane", 4.0), ("bicaridine", 4.0)],
                    capacity: 10.0,
                    single_use: true,
                    inject_on_attach_percent: 50.0,
                    disposal: transform_to_used(prototype: "UsedPatch"),
                ),
            ]"#,
        )
        .unwrap();

        let library = load_patch_library(&dir).unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.reagents.id("bicaridine"), Some(ReagentId(0)));
        assert_eq!(library.reagents.id("kelotane"), Some(ReagentId(1)));

        let brute = library.get("BrutePatch").unwrap();
        assert_eq!(brute.spec.transfer_amount, fixed(2.0));
        assert_eq!(brute.spec.update_period, Duration::from_millis(500));
        assert_eq!(brute.payload.volume(), fixed(10.0));
        assert_eq!(brute.payload.max_volume(), fixed(10.0));

        let mixed = library.get("MixedPatch").unwrap();
        assert!(mixed.spec.single_use);
        assert_eq!(mixed.spec.inject_on_attach_percent, fixed(50.0));
        assert_eq!(mixed.payload.max_volume(), fixed(10.0));
        assert_eq!(mixed.payload.quantity(ReagentId(1)), fixed(4.0));
        assert_eq!(
            mixed.spec.disposal,
            Disposal::TransformToUsed {
                prototype: "UsedPatch".to_string()
            }
        );
        assert_eq!(library.config, TransferConfig::default());
        cleanup(&dir);
    }

    #[test]
    fn declared_reagents_must_resolve() {
        let dir = make_test_dir("declared_reagents");
        fs::write(dir.join("reagents.json"), r#"[{"name": "bicaridine"}]"#).unwrap();
        fs::write(
            dir.join("patches.json"),
            r#"[{"name": "BurnPatch", "payload": [["kelotane", 5.0]]}]"#,
        )
        .unwrap();
        let err = load_patch_library(&dir).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::UnresolvedRef { ref name, expected_kind: "reagent", .. } if name == "kelotane"
        ));
        cleanup(&dir);
    }

    #[test]
    fn declared_reagent_order_fixes_ids() {
        let dir = make_test_dir("reagent_order");
        fs::write(
            dir.join("reagents.toml"),
            "[[reagents]]\nname = \"kelotane\"\n\n[[reagents]]\nname = \"bicaridine\"\n",
        )
        .unwrap();
        fs::write(
            dir.join("patches.toml"),
            "[[patches]]\nname = \"BrutePatch\"\npayload = [[\"bicaridine\", 3.0]]\n",
        )
        .unwrap();
        let library = load_patch_library(&dir).unwrap();
        let brute = library.get("BrutePatch").unwrap();
        assert_eq!(brute.payload.quantity(ReagentId(1)), fixed(3.0));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_reagent_is_error() {
        let dir = make_test_dir("dup_reagent");
        fs::write(
            dir.join("reagents.ron"),
            r#"[(name: "bicaridine"), (name: "bicaridine")]"#,
        )
        .unwrap();
        fs::write(dir.join("patches.ron"), "[]").unwrap();
        assert!(matches!(
            load_patch_library(&dir),
            Err(DataLoadError::DuplicateName { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn duplicate_patch_is_error() {
        let dir = make_test_dir("dup_patch");
        fs::write(
            dir.join("patches.ron"),
            r#"[(name: "BrutePatch"), (name: "BrutePatch")]"#,
        )
        .unwrap();
        let err = load_patch_library(&dir).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::DuplicateName { ref name, .. } if name == "BrutePatch"
        ));
        cleanup(&dir);
    }

    #[test]
    fn invalid_prototypes_are_rejected() {
        let cases = [
            ("zero_period", r#"[(name: "P", update_period: 0.0)]"#, "period"),
            ("negative_period", r#"[(name: "P", update_period: -1.0)]"#, "update_period"),
            ("bad_percent", r#"[(name: "P", inject_on_attach_percent: 150.0)]"#, "percent"),
            ("negative_amount", r#"[(name: "P", transfer_amount: -2.0)]"#, "transfer_amount"),
            (
                "overfull",
                r#"[(name: "P", capacity: 5.0, payload: [("bicaridine", 10.0)])]"#,
                "exceeds",
            ),
            (
                "negative_payload",
                r#"[(name: "P", payload: [("bicaridine", -1.0)])]"#,
                "negative",
            ),
        ];
        for (suffix, content, needle) in cases {
            let dir = make_test_dir(suffix);
            fs::write(dir.join("patches.ron"), content).unwrap();
            let err = load_patch_library(&dir).unwrap_err();
            assert!(
                matches!(err, DataLoadError::InvalidPrototype { .. }),
                "{suffix}: {err}"
            );
            assert!(err.to_string().contains(needle), "{suffix}: {err}");
            cleanup(&dir);
        }
    }

    #[test]
    fn transfer_config_file_overrides_defaults() {
        let dir = make_test_dir("transfer_config");
        fs::write(dir.join("patches.ron"), "[]").unwrap();
        fs::write(
            dir.join("transfer.toml"),
            "rejection_policy = \"Discard\"\nno_room_message = \"Vein is full\"\n",
        )
        .unwrap();
        let library = load_patch_library(&dir).unwrap();
        assert_eq!(
            library.config.rejection_policy,
            medpatch_core::transfer::RejectionPolicy::Discard
        );
        assert_eq!(library.config.no_room_message, "Vein is full");
        cleanup(&dir);
    }

    #[test]
    fn partial_transfer_config_keeps_defaults() {
        let dir = make_test_dir("partial_transfer_config");
        fs::write(dir.join("patches.ron"), "[]").unwrap();
        fs::write(dir.join("transfer.json"), r#"{"no_room_message": "Full"}"#).unwrap();
        let library = load_patch_library(&dir).unwrap();
        assert_eq!(library.config.no_room_message, "Full");
        assert_eq!(
            library.config.rejection_policy,
            medpatch_core::transfer::RejectionPolicy::Restore
        );
        cleanup(&dir);
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let data_err: DataLoadError = io_err.into();
        assert!(matches!(data_err, DataLoadError::Io(_)));
        assert!(format!("{data_err}").contains("file not found"));
    }
}
