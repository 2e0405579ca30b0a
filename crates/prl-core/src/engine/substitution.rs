use super::error::EngineError;
use super::sublattice::SublatticeModel;
use crate::core::models::element::Element;
use crate::core::models::structure::Structure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DensityLoadError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Invalid density {value} for '{element}' in '{path}'")]
    InvalidDensity {
        path: String,
        element: String,
        value: f64,
    },
}

#[derive(Debug, Deserialize)]
struct DensityRow {
    element: String,
    density: f64,
}

/// Element densities in g/cm³.
///
/// Lookups consult the overrides first and fall back to the built-in periodic table data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DensityTable {
    overrides: BTreeMap<String, f64>,
}

impl DensityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads overrides from a CSV file with an `element,density` header.
    pub fn load(path: &Path) -> Result<Self, DensityLoadError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| DensityLoadError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let mut overrides = BTreeMap::new();
        for result in reader.deserialize::<DensityRow>() {
            let row = result.map_err(|e| DensityLoadError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
            if !(row.density.is_finite() && row.density > 0.0) {
                return Err(DensityLoadError::InvalidDensity {
                    path: path.to_string_lossy().to_string(),
                    element: row.element,
                    value: row.density,
                });
            }
            overrides.insert(row.element, row.density);
        }
        debug!(path = %path.display(), count = overrides.len(), "Loaded density overrides");
        Ok(Self { overrides })
    }

    /// Loads the table from `path` when given, otherwise returns the built-in table.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, DensityLoadError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::new()),
        }
    }

    pub fn with_override(mut self, element: impl Into<String>, density: f64) -> Self {
        self.overrides.insert(element.into(), density);
        self
    }

    pub fn density(&self, element: &str) -> Result<f64, EngineError> {
        if let Some(&d) = self.overrides.get(element) {
            return Ok(d);
        }
        Ok(Element::from_symbol(element)?.try_density_of_solid()?)
    }
}

/// Stable sort of `x` by the matching keys in `y`.
pub fn sort_x_by_y<T: Clone, K: PartialOrd>(x: &[T], y: &[K]) -> Vec<T> {
    let mut pairs: Vec<(&K, &T)> = y.iter().zip(x).collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(b.0).unwrap_or(std::cmp::Ordering::Equal));
    pairs.into_iter().map(|(_, v)| v.clone()).collect()
}

/// Sorts the species of each sublattice alphabetically, carrying the occupancies along.
pub fn canonicalize_config(
    configuration: &[Vec<String>],
    occupancies: &[Vec<f64>],
) -> Result<(Vec<Vec<String>>, Vec<Vec<f64>>), EngineError> {
    check_len("occupancies", configuration.len(), occupancies.len())?;
    let mut new_config = Vec::with_capacity(configuration.len());
    let mut new_occupancies = Vec::with_capacity(configuration.len());
    for (species, occ) in configuration.iter().zip(occupancies) {
        check_len("sublattice occupancies", species.len(), occ.len())?;
        new_occupancies.push(sort_x_by_y(occ, species));
        let mut sorted = species.clone();
        sorted.sort();
        new_config.push(sorted);
    }
    Ok((new_config, new_occupancies))
}

pub fn get_density_from_pt<S: AsRef<str>>(
    elements: &[S],
    table: &DensityTable,
) -> Result<BTreeMap<String, f64>, EngineError> {
    elements
        .iter()
        .map(|e| Ok((e.as_ref().to_string(), table.density(e.as_ref())?)))
        .collect()
}

/// The species of every site, in site order.
pub fn get_ele_list_from_struct(structure: &Structure) -> Vec<String> {
    structure.species().into_iter().map(str::to_string).collect()
}

/// Scales the lattice so that the structure reaches the composition-weighted mean density of its
/// elements.
pub fn scale_struct(structure: &mut Structure, table: &DensityTable) -> Result<(), EngineError> {
    let amounts = structure.composition().el_amt_dict();
    let elements: Vec<&String> = amounts.keys().collect();
    let densities = get_density_from_pt(&elements, table)?;

    let num_atoms: f64 = amounts.values().sum();
    let expected: f64 = amounts
        .iter()
        .map(|(el, amt)| densities[el] * amt)
        .sum::<f64>()
        / num_atoms;
    let current = structure.density()?;
    let volume = structure.volume() * current / expected;
    debug!(current, expected, volume, "Scaling structure to expected density");
    structure.scale_lattice(volume)?;
    Ok(())
}

/// Maps every species of `old_config` onto the species at the same position of `new_config`.
pub fn gen_replacement_dict(
    old_config: &[Vec<String>],
    new_config: &[Vec<String>],
) -> Result<BTreeMap<String, String>, EngineError> {
    check_len("configuration", old_config.len(), new_config.len())?;
    let mut mapping = BTreeMap::new();
    for (old, new) in old_config.iter().zip(new_config) {
        check_len("sublattice configuration", old.len(), new.len())?;
        for (o, n) in old.iter().zip(new) {
            mapping.insert(o.clone(), n.clone());
        }
    }
    Ok(mapping)
}

/// Copies `template`, swaps in the species of `config` and rescales the volume.
pub fn substitute_configuration(
    template: &Structure,
    template_config: &[Vec<String>],
    config: &[Vec<String>],
    table: &DensityTable,
) -> Result<Structure, EngineError> {
    let mapping = gen_replacement_dict(template_config, config)?;
    let mut structure = template.clone();
    structure.replace_species(&mapping)?;
    scale_struct(&mut structure, table)?;
    Ok(structure)
}

/// Sublattice description written next to every generated structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationMetadata {
    pub phase_name: String,
    pub sublattice: SublatticeModel,
}

impl ConfigurationMetadata {
    /// Builds canonicalized metadata for a configuration.
    pub fn new(
        phase_name: impl Into<String>,
        configuration: &[Vec<String>],
        occupancies: &[Vec<f64>],
        site_ratios: &[f64],
    ) -> Result<Self, EngineError> {
        let (configuration, occupancies) = canonicalize_config(configuration, occupancies)?;
        Ok(Self {
            phase_name: phase_name.into(),
            sublattice: SublatticeModel::new(configuration, occupancies, site_ratios.to_vec())?,
        })
    }
}

#[allow(clippy::too_many_arguments)]
pub fn substitute_configuration_with_metadata(
    template: &Structure,
    template_config: &[Vec<String>],
    config: &[Vec<String>],
    occupation: &[Vec<f64>],
    phase_name: &str,
    site_ratios: &[f64],
    table: &DensityTable,
) -> Result<(Structure, ConfigurationMetadata), EngineError> {
    let structure = substitute_configuration(template, template_config, config, table)?;
    let metadata = ConfigurationMetadata::new(phase_name, config, occupation, site_ratios)?;
    Ok((structure, metadata))
}

pub(crate) fn check_len(
    context: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), EngineError> {
    if expected != found {
        return Err(EngineError::ShapeMismatch {
            context,
            expected,
            found,
        });
    }
    Ok(())
}
