use super::error::EngineError;
use super::substitution::check_len;
use crate::core::io::json::StructureDocument;
use crate::core::models::structure::Structure;
use crate::core::symmetry::SymmetryAnalyzer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// The species, occupancies and site ratio of every sublattice of a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSublatticeModel")]
pub struct SublatticeModel {
    pub configuration: Vec<Vec<String>>,
    pub occupancies: Vec<Vec<f64>>,
    pub site_ratios: Vec<f64>,
}

#[derive(Deserialize)]
struct RawSublatticeModel {
    configuration: Vec<Vec<String>>,
    occupancies: Vec<Vec<f64>>,
    site_ratios: Vec<f64>,
}

impl TryFrom<RawSublatticeModel> for SublatticeModel {
    type Error = EngineError;

    fn try_from(raw: RawSublatticeModel) -> Result<Self, Self::Error> {
        Self::new(raw.configuration, raw.occupancies, raw.site_ratios)
    }
}

/// A sublattice entry in ESPEI notation: a single species is written as a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EspeiSublattice<T> {
    Single(T),
    Mixed(Vec<T>),
}

impl<T: Clone> EspeiSublattice<T> {
    pub fn from_slice(values: &[T]) -> Self {
        match values {
            [single] => Self::Single(single.clone()),
            _ => Self::Mixed(values.to_vec()),
        }
    }
}

impl SublatticeModel {
    pub fn new(
        configuration: Vec<Vec<String>>,
        occupancies: Vec<Vec<f64>>,
        site_ratios: Vec<f64>,
    ) -> Result<Self, EngineError> {
        check_len("sublattice occupancies", configuration.len(), occupancies.len())?;
        check_len("sublattice site ratios", configuration.len(), site_ratios.len())?;
        for (species, occ) in configuration.iter().zip(&occupancies) {
            check_len("sublattice occupancies", species.len(), occ.len())?;
        }
        Ok(Self {
            configuration,
            occupancies,
            site_ratios,
        })
    }

    pub fn num_sublattices(&self) -> usize {
        self.configuration.len()
    }

    pub fn espei_configuration(&self) -> Vec<EspeiSublattice<String>> {
        self.configuration
            .iter()
            .map(|s| EspeiSublattice::from_slice(s.as_slice()))
            .collect()
    }

    pub fn espei_occupancies(&self) -> Vec<EspeiSublattice<f64>> {
        self.occupancies
            .iter()
            .map(|s| EspeiSublattice::from_slice(s.as_slice()))
            .collect()
    }

    /// The model with its sublattices reordered so that entry `i` is the old entry
    /// `new_indices[i]`.
    pub fn reindexed(&self, new_indices: &[usize]) -> Result<Self, EngineError> {
        let (configuration, occupancies, site_ratios) = reindex_sublattice(
            new_indices,
            &self.configuration,
            &self.occupancies,
            &self.site_ratios,
        )?;
        Ok(Self {
            configuration,
            occupancies,
            site_ratios,
        })
    }
}

/// Permutes a configuration, its occupancies and site ratios.
///
/// `new_indices` must be a permutation of `0..n` where `n` is the number of sublattices.
#[allow(clippy::type_complexity)]
pub fn reindex_sublattice(
    new_indices: &[usize],
    configuration: &[Vec<String>],
    occupancies: &[Vec<f64>],
    site_ratios: &[f64],
) -> Result<(Vec<Vec<String>>, Vec<Vec<f64>>, Vec<f64>), EngineError> {
    let n = configuration.len();
    check_len("sublattice occupancies", n, occupancies.len())?;
    check_len("sublattice site ratios", n, site_ratios.len())?;

    let unique: BTreeSet<usize> = new_indices.iter().copied().collect();
    if new_indices.len() != n || unique.len() != n || unique.iter().any(|&i| i >= n) {
        return Err(EngineError::InvalidReindex {
            indices: new_indices.to_vec(),
            len: n,
        });
    }

    Ok((
        new_indices.iter().map(|&i| configuration[i].clone()).collect(),
        new_indices.iter().map(|&i| occupancies[i].clone()).collect(),
        new_indices.iter().map(|&i| site_ratios[i]).collect(),
    ))
}

/// A structure together with its sublattice model.
///
/// Equality compares the sublattice model and the Wyckoff sites only; the geometry is ignored.
#[derive(Debug, Clone)]
pub struct SublatticeStructure {
    pub structure: Structure,
    pub sublattice: Option<SublatticeModel>,
    pub wyckoff_sites: Option<Vec<String>>,
    /// Name of every sublattice of the model, merged groups included, in model order.
    pub sublattice_names: Option<Vec<String>>,
}

impl PartialEq for SublatticeStructure {
    fn eq(&self, other: &Self) -> bool {
        self.sublattice == other.sublattice && self.wyckoff_sites == other.wyckoff_sites
    }
}

impl SublatticeStructure {
    pub fn new(structure: Structure) -> Self {
        Self {
            structure,
            sublattice: None,
            wyckoff_sites: None,
            sublattice_names: None,
        }
    }

    pub fn with_model(structure: Structure, model: SublatticeModel) -> Self {
        Self {
            structure,
            sublattice: Some(model),
            wyckoff_sites: None,
            sublattice_names: None,
        }
    }

    /// Derives the sublattice model of an ordered structure from its symmetry.
    ///
    /// Sites are grouped by Wyckoff letter, with orbits sharing a letter told apart as `f`, `f2`,
    /// `f3`. Each group of `equivalent_sites` is merged into one sublattice named by joining its
    /// sorted members with `-`.
    pub fn from_structure(
        structure: &Structure,
        equivalent_sites: Option<&[Vec<String>]>,
        analyzer: &SymmetryAnalyzer,
    ) -> Result<Self, EngineError> {
        let dataset = analyzer.analyze(structure)?;
        let site_labels = dataset.orbit_labels();

        let merged: Vec<(String, BTreeSet<&str>)> = equivalent_sites
            .unwrap_or_default()
            .iter()
            .map(|group| {
                let members: BTreeSet<&str> = group.iter().map(String::as_str).collect();
                let name = members.iter().copied().collect::<Vec<_>>().join("-");
                (name, members)
            })
            .collect();
        let sublattice_of = |label: &str| -> String {
            merged
                .iter()
                .find(|(_, members)| members.contains(label))
                .map_or_else(|| label.to_string(), |(name, _)| name.clone())
        };

        let mut species_by_sublattice: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for (site, label) in structure.sites().iter().zip(&site_labels) {
            *species_by_sublattice
                .entry(sublattice_of(label.as_str()))
                .or_default()
                .entry(site.species.to_uppercase())
                .or_insert(0) += 1;
        }

        let mut configuration = Vec::with_capacity(species_by_sublattice.len());
        let mut occupancies = Vec::with_capacity(species_by_sublattice.len());
        let mut site_ratios = Vec::with_capacity(species_by_sublattice.len());
        for counts in species_by_sublattice.values() {
            let total: usize = counts.values().sum();
            configuration.push(counts.keys().cloned().collect());
            occupancies.push(
                counts
                    .values()
                    .map(|&c| c as f64 / total as f64)
                    .collect(),
            );
            site_ratios.push(total as f64);
        }

        let wyckoff_sites: Vec<String> = site_labels
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let sublattice_names: Vec<String> = species_by_sublattice.into_keys().collect();
        debug!(
            sublattices = ?sublattice_names,
            wyckoff_sites = ?wyckoff_sites,
            "Derived sublattice model"
        );

        Ok(Self {
            structure: structure.clone(),
            sublattice: Some(SublatticeModel::new(configuration, occupancies, site_ratios)?),
            wyckoff_sites: Some(wyckoff_sites),
            sublattice_names: Some(sublattice_names),
        })
    }

    pub fn espei_sublattice_configuration(&self) -> Option<Vec<EspeiSublattice<String>>> {
        self.sublattice.as_ref().map(SublatticeModel::espei_configuration)
    }

    pub fn espei_sublattice_occupancies(&self) -> Option<Vec<EspeiSublattice<f64>>> {
        self.sublattice.as_ref().map(SublatticeModel::espei_occupancies)
    }

    pub fn reindex(&mut self, new_indices: &[usize]) -> Result<(), EngineError> {
        let model = self
            .sublattice
            .as_ref()
            .ok_or(EngineError::MissingSublatticeModel)?;
        self.sublattice = Some(model.reindexed(new_indices)?);
        Ok(())
    }

    pub fn to_document(&self) -> SublatticeStructureDocument {
        let model = self.sublattice.as_ref();
        SublatticeStructureDocument {
            structure: StructureDocument::from(&self.structure),
            sublattice_configuration: model.map(|m| m.configuration.clone()),
            sublattice_occupancies: model.map(|m| m.occupancies.clone()),
            sublattice_site_ratios: model.map(|m| m.site_ratios.clone()),
        }
    }

    pub fn from_document(doc: SublatticeStructureDocument) -> Result<Self, EngineError> {
        let structure = Structure::try_from(doc.structure)?;
        let sublattice = match (
            doc.sublattice_configuration,
            doc.sublattice_occupancies,
            doc.sublattice_site_ratios,
        ) {
            (Some(configuration), Some(occupancies), Some(site_ratios)) => Some(
                SublatticeModel::new(configuration, occupancies, site_ratios)?,
            ),
            _ => None,
        };
        Ok(Self {
            structure,
            sublattice,
            wyckoff_sites: None,
            sublattice_names: None,
        })
    }
}

/// The JSON layout of a [`SublatticeStructure`]: a structure document with the sublattice model
/// as extra top-level keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SublatticeStructureDocument {
    #[serde(flatten)]
    pub structure: StructureDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublattice_configuration: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublattice_occupancies: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublattice_site_ratios: Option<Vec<f64>>,
}
