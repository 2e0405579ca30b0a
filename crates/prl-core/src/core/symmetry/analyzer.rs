use crate::core::models::structure::Structure;
use moyo::MoyoDataset;
use moyo::base::{AngleTolerance, Cell, Lattice as MoyoLattice, MoyoError, Operation};
use moyo::data::Setting;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_SYMPREC: f64 = 1e-2;
/// Angle tolerance in degrees, as used by pymatgen's `SpacegroupAnalyzer`.
pub const DEFAULT_ANGLE_TOLERANCE: f64 = 5.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SymmetryError {
    #[error("Cannot analyze the symmetry of a structure without sites")]
    EmptyStructure,
    #[error("Symmetry tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),
    #[error("Symmetry search failed with tolerance {symprec}: {source}")]
    Search {
        symprec: f64,
        #[source]
        source: MoyoError,
    },
}

/// Space-group type of a structure: Hermann-Mauguin symbol and ITA number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceGroupInfo {
    pub symbol: String,
    pub number: i32,
}

/// The symmetry of a periodic structure, in the spglib setting.
#[derive(Debug, Clone)]
pub struct SymmetryDataset {
    pub space_group: SpaceGroupInfo,
    /// Space-group operations in the basis of the input lattice.
    pub operations: Vec<Operation>,
    /// For every site, the lowest index of a site in the same orbit.
    pub equivalent_atoms: Vec<usize>,
    /// Wyckoff letter of every site.
    pub wyckoffs: Vec<char>,
    pub site_symmetry_symbols: Vec<String>,
}

impl SymmetryDataset {
    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }

    /// Sorted orbit representatives (the distinct values of `equivalent_atoms`).
    pub fn orbit_representatives(&self) -> Vec<usize> {
        let mut reps = self.equivalent_atoms.clone();
        reps.sort_unstable();
        reps.dedup();
        reps
    }

    /// Sorted distinct Wyckoff letters.
    pub fn distinct_wyckoffs(&self) -> Vec<char> {
        let mut letters = self.wyckoffs.clone();
        letters.sort_unstable();
        letters.dedup();
        letters
    }

    /// Site labels made unique per orbit: the second orbit sharing letter `f` becomes `f2`, the
    /// third `f3`, and so on, in order of orbit representative.
    pub fn orbit_labels(&self) -> Vec<String> {
        let mut seen: BTreeMap<char, usize> = BTreeMap::new();
        let mut label_of_rep: BTreeMap<usize, String> = BTreeMap::new();
        for rep in self.orbit_representatives() {
            let letter = self.wyckoffs[rep];
            let count = seen.entry(letter).or_insert(0);
            *count += 1;
            let label = if *count == 1 {
                letter.to_string()
            } else {
                format!("{}{}", letter, count)
            };
            label_of_rep.insert(rep, label);
        }
        self.equivalent_atoms
            .iter()
            .map(|rep| label_of_rep[rep].clone())
            .collect()
    }
}

/// Finds the space group, orbits and Wyckoff positions of a structure with moyo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetryAnalyzer {
    symprec: f64,
    angle_tolerance: f64,
    ignore_species: bool,
}

impl Default for SymmetryAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_SYMPREC)
    }
}

impl SymmetryAnalyzer {
    /// Creates an analyzer with a Cartesian distance tolerance `symprec` in Å.
    pub fn new(symprec: f64) -> Self {
        Self {
            symprec,
            angle_tolerance: DEFAULT_ANGLE_TOLERANCE,
            ignore_species: false,
        }
    }

    /// Sets the angle tolerance in degrees. A non-positive value selects moyo's default.
    pub fn angle_tolerance(mut self, degrees: f64) -> Self {
        self.angle_tolerance = degrees;
        self
    }

    /// Treats every site as the same species.
    pub fn ignore_species(mut self, ignore: bool) -> Self {
        self.ignore_species = ignore;
        self
    }

    pub fn symprec(&self) -> f64 {
        self.symprec
    }

    pub fn analyze(&self, structure: &Structure) -> Result<SymmetryDataset, SymmetryError> {
        if !self.symprec.is_finite() || self.symprec <= 0.0 {
            return Err(SymmetryError::InvalidTolerance(self.symprec));
        }
        if structure.is_empty() {
            return Err(SymmetryError::EmptyStructure);
        }

        let cell = self.to_cell(structure);
        let angle_tolerance = if self.angle_tolerance > 0.0 {
            AngleTolerance::Radian(self.angle_tolerance.to_radians())
        } else {
            AngleTolerance::Default
        };
        let dataset = MoyoDataset::new(&cell, self.symprec, angle_tolerance, Setting::Spglib, false)
            .map_err(|source| SymmetryError::Search {
                symprec: self.symprec,
                source,
            })?;
        debug!(
            number = dataset.number,
            symbol = %dataset.hm_symbol,
            num_operations = dataset.num_operations(),
            num_sites = structure.num_sites(),
            "Space group identified"
        );

        Ok(SymmetryDataset {
            space_group: SpaceGroupInfo {
                symbol: dataset.hm_symbol,
                number: dataset.number,
            },
            operations: dataset.operations,
            equivalent_atoms: dataset.orbits,
            wyckoffs: dataset.wyckoffs,
            site_symmetry_symbols: dataset.site_symmetry_symbols,
        })
    }

    /// Space-group symbol and number of `structure`.
    pub fn space_group(&self, structure: &Structure) -> Result<SpaceGroupInfo, SymmetryError> {
        self.analyze(structure).map(|dataset| dataset.space_group)
    }

    fn to_cell(&self, structure: &Structure) -> Cell {
        // moyo takes the lattice vectors as rows.
        let lattice = MoyoLattice::new(structure.lattice().matrix().transpose());
        let positions = structure.sites().iter().map(|s| s.frac_coords).collect();

        let mut ids: BTreeMap<&str, i32> = BTreeMap::new();
        let numbers = structure
            .species()
            .into_iter()
            .map(|species| {
                if self.ignore_species {
                    return 0;
                }
                let next = ids.len() as i32;
                *ids.entry(species).or_insert(next)
            })
            .collect();
        Cell::new(lattice, positions, numbers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::lattice::Lattice;
    use nalgebra::Vector3;

    fn fcc_cu() -> Structure {
        Structure::from_species_and_coords(
            Lattice::cubic(3.615).unwrap(),
            &["Cu"; 4],
            &[
                [0.0, 0.0, 0.0],
                [0.0, 0.5, 0.5],
                [0.5, 0.0, 0.5],
                [0.5, 0.5, 0.0],
            ],
        )
    }

    fn b2_cscl() -> Structure {
        Structure::from_species_and_coords(
            Lattice::cubic(4.12).unwrap(),
            &["Cs", "Cl"],
            &[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
        )
    }

    fn l12_ni3al() -> Structure {
        Structure::from_species_and_coords(
            Lattice::cubic(3.57).unwrap(),
            &["Al", "Ni", "Ni", "Ni"],
            &[
                [0.0, 0.0, 0.0],
                [0.0, 0.5, 0.5],
                [0.5, 0.0, 0.5],
                [0.5, 0.5, 0.0],
            ],
        )
    }

    fn hcp_mg() -> Structure {
        Structure::from_species_and_coords(
            Lattice::hexagonal(3.21, 5.21).unwrap(),
            &["Mg", "Mg"],
            &[[1.0 / 3.0, 2.0 / 3.0, 0.25], [2.0 / 3.0, 1.0 / 3.0, 0.75]],
        )
    }

    #[test]
    fn fcc_conventional_cell_has_one_orbit() {
        let dataset = SymmetryAnalyzer::default().analyze(&fcc_cu()).unwrap();
        assert_eq!(dataset.space_group.number, 225);
        assert_eq!(dataset.num_operations(), 192);
        assert_eq!(dataset.equivalent_atoms, vec![0, 0, 0, 0]);
        assert_eq!(dataset.wyckoffs, vec!['a'; 4]);
    }

    #[test]
    fn cscl_has_two_distinct_wyckoff_positions() {
        let dataset = SymmetryAnalyzer::default().analyze(&b2_cscl()).unwrap();
        assert_eq!(dataset.space_group.number, 221);
        assert_eq!(dataset.num_operations(), 48);
        assert_eq!(dataset.equivalent_atoms, vec![0, 1]);
        assert_eq!(dataset.distinct_wyckoffs(), vec!['a', 'b']);
    }

    #[test]
    fn ignoring_species_turns_cscl_into_bcc() {
        let analyzer = SymmetryAnalyzer::default().ignore_species(true);
        let dataset = analyzer.analyze(&b2_cscl()).unwrap();
        assert_eq!(dataset.space_group.number, 229);
        assert_eq!(dataset.num_operations(), 96);
        assert_eq!(dataset.equivalent_atoms, vec![0, 0]);
        assert_eq!(dataset.wyckoffs, vec!['a', 'a']);
    }

    #[test]
    fn l12_separates_corner_and_face_sites() {
        let dataset = SymmetryAnalyzer::default().analyze(&l12_ni3al()).unwrap();
        assert_eq!(dataset.space_group.number, 221);
        assert_eq!(dataset.equivalent_atoms, vec![0, 1, 1, 1]);
        let w = &dataset.wyckoffs;
        assert!(w[1] == w[2] && w[2] == w[3]);
        assert_ne!(w[0], w[1]);
    }

    #[test]
    fn hcp_sites_sit_on_the_2c_position() {
        let dataset = SymmetryAnalyzer::default().analyze(&hcp_mg()).unwrap();
        assert_eq!(dataset.space_group.number, 194);
        assert_eq!(dataset.space_group.symbol.replace(' ', ""), "P6_3/mmc");
        assert_eq!(dataset.num_operations(), 24);
        assert_eq!(dataset.equivalent_atoms, vec![0, 0]);
        assert_eq!(dataset.wyckoffs, vec!['c', 'c']);
    }

    #[test]
    fn operations_map_sites_onto_sites() {
        let structure = l12_ni3al();
        let dataset = SymmetryAnalyzer::default().analyze(&structure).unwrap();
        let face = Vector3::new(0.0, 0.5, 0.5);
        for op in &dataset.operations {
            let moved = op.rotation.map(f64::from) * face + op.translation;
            let on_face_site = structure.sites()[1..].iter().any(|s| {
                let d = (moved - s.frac_coords).map(|c| c - c.round());
                d.norm() < 1e-6
            });
            assert!(on_face_site);
        }
    }

    #[test]
    fn general_positions_share_a_letter_but_not_an_orbit() {
        let lattice = Lattice::from_rows([[3.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 5.0]]).unwrap();
        let p1 = Structure::from_species_and_coords(
            lattice,
            &["Fe", "Fe", "Fe"],
            &[[0.0, 0.0, 0.0], [0.1, 0.2, 0.3], [0.37, 0.61, 0.13]],
        );
        let dataset = SymmetryAnalyzer::default().analyze(&p1).unwrap();
        assert_eq!(dataset.space_group.number, 1);
        assert_eq!(dataset.space_group.symbol.replace(' ', ""), "P1");
        assert_eq!(dataset.num_operations(), 1);
        assert_eq!(dataset.equivalent_atoms, vec![0, 1, 2]);
        assert_eq!(dataset.distinct_wyckoffs(), vec!['a']);
        assert_eq!(dataset.orbit_labels(), vec!["a", "a2", "a3"]);
    }

    #[test]
    fn orbit_labels_keep_single_orbit_letters() {
        let dataset = SymmetryAnalyzer::default().analyze(&l12_ni3al()).unwrap();
        let labels = dataset.orbit_labels();
        assert_eq!(labels[0], dataset.wyckoffs[0].to_string());
        assert_eq!(labels[1], dataset.wyckoffs[1].to_string());
    }

    #[test]
    fn space_group_reports_symbol_and_number() {
        let info = SymmetryAnalyzer::default().space_group(&fcc_cu()).unwrap();
        assert_eq!(info.number, 225);
        assert_eq!(info.symbol.replace(' ', ""), "Fm-3m");
    }

    #[test]
    fn empty_structure_and_bad_tolerance_are_errors() {
        let empty = Structure::new(Lattice::cubic(3.0).unwrap(), Vec::new());
        assert_eq!(
            SymmetryAnalyzer::default().analyze(&empty).unwrap_err(),
            SymmetryError::EmptyStructure
        );
        assert_eq!(
            SymmetryAnalyzer::new(0.0).analyze(&fcc_cu()).unwrap_err(),
            SymmetryError::InvalidTolerance(0.0)
        );
    }
}
