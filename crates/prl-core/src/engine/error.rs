use thiserror::Error;

use super::config::ConfigError;
use super::substitution::DensityLoadError;
use crate::core::database::DatabaseError;
use crate::core::io::json::JsonError;
use crate::core::models::element::ElementError;
use crate::core::models::structure::StructureError;
use crate::core::symmetry::SymmetryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Structure operation failed: {source}")]
    Structure {
        #[from]
        source: StructureError,
    },

    #[error("Element lookup failed: {source}")]
    Element {
        #[from]
        source: ElementError,
    },

    #[error("Symmetry analysis failed: {source}")]
    Symmetry {
        #[from]
        source: SymmetryError,
    },

    #[error("Density table could not be loaded: {source}")]
    Density {
        #[from]
        source: DensityLoadError,
    },

    #[error("SQS database error: {source}")]
    Database {
        #[from]
        source: DatabaseError,
    },

    #[error("Invalid structure document: {source}")]
    Document {
        #[from]
        source: JsonError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Length mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Re-indexing indices {indices:?} are not a permutation of 0..{len}")]
    InvalidReindex { indices: Vec<usize>, len: usize },

    #[error("No candidate species given for sublattice '{0}'")]
    MissingSublattice(String),

    #[error("Site {index} has no sublattice label")]
    MissingSiteLabel { index: usize },

    #[error("Structure has no sublattice model")]
    MissingSublatticeModel,
}
