//! Crystallographic symmetry of periodic structures.
//!
//! [`analyzer::SymmetryAnalyzer`] hands a structure to moyo and keeps what the sublattice and SQS
//! code needs from the result: the space-group symbol and number, the operations, the orbits of
//! equivalent atoms and the Wyckoff letter of every site, all in the spglib setting.

pub mod analyzer;

pub use analyzer::{SpaceGroupInfo, SymmetryAnalyzer, SymmetryDataset, SymmetryError};
