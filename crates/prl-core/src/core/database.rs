use crate::core::io::json::StructureDocument;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Name of the table TinyDB writes records into by default.
pub const DEFAULT_TABLE: &str = "_default";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Invalid database layout: {0}")]
    Layout(String),
}

/// One abstract SQS as stored in the database.
///
/// The structure's species are abstract labels `X{sublattice name}{species}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<String>,
    pub sublattice_model: Vec<Vec<String>>,
    pub sublattice_names: Vec<String>,
    #[serde(default)]
    pub sublattice_site_ratios: Vec<Vec<f64>>,
    #[serde(flatten)]
    pub structure: StructureDocument,
    /// Keys this crate does not interpret, such as `symmetry`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Returns true if `l1` is a multiple of `l2` or vice versa.
///
/// The lists must have equal length, every element of one must divide the matching element of
/// the other, and all quotients must be equal. A zero divisor never divides.
pub fn lists_are_multiple(l1: &[f64], l2: &[f64]) -> bool {
    if l1.len() != l2.len() {
        return false;
    }
    [(l1, l2), (l2, l1)].into_iter().any(|(a, b)| {
        let quotients: Option<Vec<f64>> = a
            .iter()
            .zip(b)
            .map(|(&x, &y)| (y != 0.0 && x % y == 0.0).then(|| x / y))
            .collect();
        match quotients {
            Some(q) => q.windows(2).all(|w| w[0] == w[1]),
            None => false,
        }
    })
}

/// An in-memory list store of abstract SQS records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqsDatabase {
    records: Vec<SqsRecord>,
}

impl SqsDatabase {
    pub fn new(records: Vec<SqsRecord>) -> Self {
        Self { records }
    }

    /// Loads a TinyDB JSON file (`{"_default": {"1": {...}}}`) or a plain JSON array of records.
    pub fn load(path: &Path) -> Result<Self, DatabaseError> {
        let content = std::fs::read_to_string(path).map_err(|e| DatabaseError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| DatabaseError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_value(value)
    }

    /// Builds the store from a parsed TinyDB document or record array.
    ///
    /// Documents that are not SQS records, such as notes kept in the same table, are skipped
    /// with a warning.
    pub fn from_value(value: Value) -> Result<Self, DatabaseError> {
        let documents: Vec<(String, Value)> = match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect(),
            Value::Object(tables) => {
                let mut documents = Vec::new();
                for (table_name, table) in tables {
                    let Value::Object(rows) = table else {
                        return Err(DatabaseError::Layout(format!(
                            "table '{}' is not an object",
                            table_name
                        )));
                    };
                    let mut rows: Vec<(String, Value)> = rows.into_iter().collect();
                    rows.sort_by_key(|(id, _)| id.parse::<u64>().unwrap_or(u64::MAX));
                    documents.extend(
                        rows.into_iter()
                            .map(|(id, row)| (format!("{}/{}", table_name, id), row)),
                    );
                }
                documents
            }
            other => {
                return Err(DatabaseError::Layout(format!(
                    "expected an array or an object of tables, found {}",
                    json_type_name(&other)
                )));
            }
        };

        let mut records = Vec::with_capacity(documents.len());
        for (id, document) in documents {
            match serde_json::from_value::<SqsRecord>(document) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    document = %id,
                    error = %e,
                    "Skipping document that is not an SQS record"
                ),
            }
        }
        Ok(Self { records })
    }

    /// Writes the records in TinyDB layout, numbering them from 1.
    pub fn save(&self, path: &Path) -> Result<(), DatabaseError> {
        let mut table = Map::new();
        for (i, record) in self.records.iter().enumerate() {
            let value = serde_json::to_value(record).map_err(|e| DatabaseError::Json {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
            table.insert((i + 1).to_string(), value);
        }
        let mut root = Map::new();
        root.insert(DEFAULT_TABLE.to_string(), Value::Object(table));

        let text =
            serde_json::to_string_pretty(&Value::Object(root)).map_err(|e| DatabaseError::Json {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
        std::fs::write(path, text).map_err(|e| DatabaseError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn insert(&mut self, record: SqsRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[SqsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of the given prototype whose per-sublattice site ratio sums are a multiple of
    /// `subl_site_ratios`.
    pub fn search(&self, prototype: &str, subl_site_ratios: &[f64]) -> Vec<&SqsRecord> {
        self.records
            .iter()
            .filter(|r| r.prototype.as_deref() == Some(prototype))
            .filter(|r| {
                let sums: Vec<f64> = r
                    .sublattice_site_ratios
                    .iter()
                    .map(|subl| subl.iter().sum())
                    .collect();
                lists_are_multiple(&sums, subl_site_ratios)
            })
            .collect()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
