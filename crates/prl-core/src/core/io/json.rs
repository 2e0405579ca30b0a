use crate::core::io::traits::StructureFile;
use crate::core::models::lattice::Lattice;
use crate::core::models::structure::{Site, SiteProperties, Structure};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Site {index} has {count} species; only ordered sites are supported")]
    DisorderedSite { index: usize, count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesOccupancy {
    pub element: String,
    #[serde(default = "full_occupancy")]
    pub occu: f64,
}

fn full_occupancy() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDocument {
    pub species: Vec<SpeciesOccupancy>,
    pub abc: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xyz: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub properties: SiteProperties,
}

/// The dictionary layout pymatgen uses for structures.
///
/// Only `lattice.matrix` and, per site, `species[0].element`, `abc` and `properties` are read
/// back. The remaining keys are written for readers that expect the full layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDocument {
    #[serde(rename = "@module", default = "default_module")]
    pub module: String,
    #[serde(rename = "@class", default = "default_class")]
    pub class: String,
    pub lattice: Lattice,
    pub sites: Vec<SiteDocument>,
}

fn default_module() -> String {
    "pymatgen.core.structure".to_string()
}

fn default_class() -> String {
    "Structure".to_string()
}

impl From<&Structure> for StructureDocument {
    fn from(structure: &Structure) -> Self {
        let lattice = structure.lattice();
        let sites = structure
            .sites()
            .iter()
            .map(|site| {
                let xyz = lattice.to_cartesian(&site.frac_coords);
                SiteDocument {
                    species: vec![SpeciesOccupancy {
                        element: site.species.clone(),
                        occu: 1.0,
                    }],
                    abc: [site.frac_coords[0], site.frac_coords[1], site.frac_coords[2]],
                    xyz: Some([xyz[0], xyz[1], xyz[2]]),
                    label: Some(site.species.clone()),
                    properties: site.properties.clone(),
                }
            })
            .collect();
        Self {
            module: default_module(),
            class: default_class(),
            lattice: lattice.clone(),
            sites,
        }
    }
}

impl TryFrom<StructureDocument> for Structure {
    type Error = JsonError;

    fn try_from(doc: StructureDocument) -> Result<Self, Self::Error> {
        let sites = doc
            .sites
            .into_iter()
            .enumerate()
            .map(|(index, site)| {
                let count = site.species.len();
                let [species] = <[SpeciesOccupancy; 1]>::try_from(site.species)
                    .map_err(|_| JsonError::DisorderedSite { index, count })?;
                Ok(Site {
                    species: species.element,
                    frac_coords: Vector3::new(site.abc[0], site.abc[1], site.abc[2]),
                    properties: site.properties,
                })
            })
            .collect::<Result<Vec<_>, JsonError>>()?;
        Ok(Structure::new(doc.lattice, sites))
    }
}

/// Top-level keys of a JSON document that are not part of the structure itself, such as
/// `sublattice_configuration`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonMetadata {
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize)]
struct JsonDocument {
    #[serde(flatten)]
    structure: StructureDocument,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Structures as pymatgen-style JSON dictionaries.
pub struct JsonFile;

impl StructureFile for JsonFile {
    type Metadata = JsonMetadata;
    type Error = JsonError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Structure, Self::Metadata), Self::Error> {
        let doc: JsonDocument = serde_json::from_reader(reader)?;
        let structure = Structure::try_from(doc.structure)?;
        Ok((structure, JsonMetadata { extra: doc.extra }))
    }

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let doc = JsonDocument {
            structure: StructureDocument::from(structure),
            extra: metadata.extra.clone(),
        };
        serde_json::to_writer_pretty(&mut *writer, &doc)?;
        writeln!(writer)?;
        Ok(())
    }

    fn write_structure_to(
        structure: &Structure,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        Self::write_to(structure, &JsonMetadata::default(), writer)
    }
}
