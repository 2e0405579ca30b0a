//! Provides input/output functionality for crystal structure file formats.
//!
//! All formats implement the [`traits::StructureFile`] trait: VASP 5 POSCAR files
//! ([`poscar`]) and pymatgen-style JSON dictionaries ([`json`]), which also carry site
//! sublattice labels and arbitrary extra top-level keys.

pub mod json;
pub mod poscar;
pub mod traits;
