use crate::error::{CliError, Result};
use prlstructure::core::io::json::JsonFile;
use prlstructure::core::io::poscar::PoscarFile;
use prlstructure::core::io::traits::StructureFile;
use prlstructure::core::models::structure::Structure;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the per-run metadata file written next to the generated structures.
pub const METADATA_FILE: &str = "metadata.json";

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Reads a structure as JSON when the file ends in `.json`, and as POSCAR otherwise.
pub fn read_structure(path: &Path) -> Result<Structure> {
    debug!("Reading structure from {:?}", path);
    let structure = if is_json(path) {
        JsonFile::read_from_path(path).map(|(s, _)| s).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?
    } else {
        PoscarFile::read_from_path(path).map(|(s, _)| s).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?
    };
    Ok(structure)
}

/// Writes `structure` as `<dir>/<name>.vasp`, with its formula as the comment line.
pub fn write_poscar(dir: &Path, name: &str, structure: &Structure) -> Result<PathBuf> {
    let path = dir.join(format!("{name}.vasp"));
    PoscarFile::write_structure_to_path(structure, &path).map_err(|e| CliError::FileWriting {
        path: path.clone(),
        source: e.into(),
    })?;
    debug!("Wrote {:?}", path);
    Ok(path)
}

/// Writes `value` as pretty JSON to `<dir>/metadata.json`.
pub fn write_metadata<T: Serialize>(dir: &Path, value: &T) -> Result<PathBuf> {
    let path = dir.join(METADATA_FILE);
    let content = serde_json::to_string_pretty(value).map_err(|e| CliError::FileWriting {
        path: path.clone(),
        source: e.into(),
    })?;
    fs::write(&path, content + "\n")?;
    Ok(path)
}

/// File name of a generated structure: a zero-padded index followed by its species.
pub fn structure_name(index: usize, species: &[String]) -> String {
    format!("{:03}_{}", index, species.join("-"))
}

/// Path of `path` relative to `base` when it lies inside it, for compact metadata entries.
pub fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}
