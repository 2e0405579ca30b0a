use super::composition::Composition;
use super::element::{Element, ElementError};
use super::lattice::{Lattice, LatticeError, SupercellMatrix};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Converts amu/Å³ to g/cm³.
pub const AMU_PER_CUBIC_ANGSTROM_TO_G_PER_CM3: f64 = 1.660_539_066_60;

/// Tolerance used when wrapping fractional coordinates into the unit cell.
const WRAP_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Error)]
pub enum StructureError {
    #[error(transparent)]
    Lattice(#[from] LatticeError),
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error("Species to be substituted are not present in the structure: {0:?}")]
    SpeciesNotPresent(Vec<String>),
    #[error("Site index {index} is out of range for a structure with {len} sites")]
    SiteIndex { index: usize, len: usize },
    #[error("Supercell expansion produced {found} sites, expected {expected}")]
    SupercellSiteCount { expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiteProperties {
    #[serde(
        rename = "sublattice_sites",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sublattice: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub species: String,
    pub frac_coords: Vector3<f64>,
    pub properties: SiteProperties,
}

impl Site {
    pub fn new(species: impl Into<String>, frac_coords: Vector3<f64>) -> Self {
        Self {
            species: species.into(),
            frac_coords,
            properties: SiteProperties::default(),
        }
    }

    pub fn with_sublattice(mut self, label: impl Into<String>) -> Self {
        self.properties.sublattice = Some(label.into());
        self
    }

    pub fn sublattice(&self) -> Option<&str> {
        self.properties.sublattice.as_deref()
    }
}

/// A periodic crystal structure: a lattice and an ordered list of sites.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    lattice: Lattice,
    sites: Vec<Site>,
}

impl Structure {
    pub fn new(lattice: Lattice, sites: Vec<Site>) -> Self {
        Self { lattice, sites }
    }

    /// Convenience constructor from parallel species and fractional-coordinate lists.
    pub fn from_species_and_coords<S: AsRef<str>>(
        lattice: Lattice,
        species: &[S],
        frac_coords: &[[f64; 3]],
    ) -> Self {
        let sites = species
            .iter()
            .zip(frac_coords)
            .map(|(sp, c)| Site::new(sp.as_ref(), Vector3::new(c[0], c[1], c[2])))
            .collect();
        Self::new(lattice, sites)
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn sites_mut(&mut self) -> &mut [Site] {
        &mut self.sites
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn volume(&self) -> f64 {
        self.lattice.volume()
    }

    /// The species label of every site, in site order.
    pub fn species(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.species.as_str()).collect()
    }

    pub fn composition(&self) -> Composition {
        Composition::from_species(self.sites.iter().map(|s| s.species.as_str()))
    }

    pub fn cart_coords(&self, index: usize) -> Result<Vector3<f64>, StructureError> {
        let site = self.sites.get(index).ok_or(StructureError::SiteIndex {
            index,
            len: self.sites.len(),
        })?;
        Ok(self.lattice.to_cartesian(&site.frac_coords))
    }

    /// Total mass in amu. Every species must be a real element.
    pub fn mass(&self) -> Result<f64, StructureError> {
        self.sites.iter().try_fold(0.0, |acc, site| {
            Ok(acc + Element::from_symbol(&site.species)?.atomic_mass())
        })
    }

    /// Mass density in g/cm³.
    pub fn density(&self) -> Result<f64, StructureError> {
        Ok(self.mass()? * AMU_PER_CUBIC_ANGSTROM_TO_G_PER_CM3 / self.volume())
    }

    /// Renames species simultaneously, so `{A: B, B: A}` swaps them.
    ///
    /// Every key must name a species present in the structure.
    pub fn replace_species(
        &mut self,
        mapping: &BTreeMap<String, String>,
    ) -> Result<(), StructureError> {
        let present: BTreeSet<&str> = self.sites.iter().map(|s| s.species.as_str()).collect();
        let missing: Vec<String> = mapping
            .keys()
            .filter(|k| !present.contains(k.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(StructureError::SpeciesNotPresent(missing));
        }

        for site in &mut self.sites {
            if let Some(new) = mapping.get(&site.species) {
                site.species = new.clone();
            }
        }
        Ok(())
    }

    pub fn replace_site_species(
        &mut self,
        index: usize,
        species: impl Into<String>,
    ) -> Result<(), StructureError> {
        let len = self.sites.len();
        let site = self
            .sites
            .get_mut(index)
            .ok_or(StructureError::SiteIndex { index, len })?;
        site.species = species.into();
        Ok(())
    }

    /// Scales the lattice isotropically to `volume`, keeping fractional coordinates.
    pub fn scale_lattice(&mut self, volume: f64) -> Result<(), StructureError> {
        self.lattice = self.lattice.scaled_to_volume(volume)?;
        Ok(())
    }

    /// Expands the structure into a supercell.
    ///
    /// Images of a site are kept together and appear in the order of the original sites. Site
    /// properties are copied to every image.
    pub fn make_supercell(&mut self, scaling: &SupercellMatrix) -> Result<(), StructureError> {
        let new_lattice = self.lattice.supercell(scaling)?;
        let s = scaling.matrix();
        let s_f = s.map(f64::from);
        // x_new = S⁻ᵀ x_old
        let to_new = s_f
            .transpose()
            .try_inverse()
            .ok_or(LatticeError::InvalidSupercell(scaling.determinant()))?;

        let (lo, hi) = translation_bounds(&s);
        let mut translations = Vec::new();
        for i in lo[0]..=hi[0] {
            for j in lo[1]..=hi[1] {
                for k in lo[2]..=hi[2] {
                    let t = Vector3::new(i as f64, j as f64, k as f64);
                    let f = to_new * t;
                    if f.iter().all(|&c| (-WRAP_TOLERANCE..1.0 - WRAP_TOLERANCE).contains(&c)) {
                        translations.push(t);
                    }
                }
            }
        }

        let expected = self.sites.len() * scaling.determinant() as usize;
        let mut sites = Vec::with_capacity(expected);
        for site in &self.sites {
            for t in &translations {
                let frac = wrap_frac(&(to_new * (site.frac_coords + t)));
                sites.push(Site {
                    species: site.species.clone(),
                    frac_coords: frac,
                    properties: site.properties.clone(),
                });
            }
        }

        if sites.len() != expected {
            return Err(StructureError::SupercellSiteCount {
                expected,
                found: sites.len(),
            });
        }

        self.lattice = new_lattice;
        self.sites = sites;
        Ok(())
    }
}

/// Wraps fractional coordinates into `[0, 1)`.
pub fn wrap_frac(frac: &Vector3<f64>) -> Vector3<f64> {
    frac.map(|c| {
        let w = c - (c + WRAP_TOLERANCE).floor();
        if w < 0.0 { 0.0 } else { w }
    })
}

/// Integer bounding box of the supercell, in old fractional coordinates.
fn translation_bounds(s: &nalgebra::Matrix3<i32>) -> ([i32; 3], [i32; 3]) {
    let mut lo = [0; 3];
    let mut hi = [0; 3];
    for corner in 0..8u8 {
        let c = [corner & 1, (corner >> 1) & 1, (corner >> 2) & 1].map(i32::from);
        for axis in 0..3 {
            let v: i32 = (0..3).map(|row| c[row] * s[(row, axis)]).sum();
            lo[axis] = lo[axis].min(v);
            hi[axis] = hi[axis].max(v);
        }
    }
    (lo, hi)
}
