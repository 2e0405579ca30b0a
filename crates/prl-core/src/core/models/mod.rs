//! # Core Models Module
//!
//! Data structures describing periodic crystal structures.
//!
//! ## Key Components
//!
//! - [`element`] - Static periodic table with masses and solid densities
//! - [`lattice`] - Lattice vectors, volume, coordinate conversion and supercell matrices
//! - [`structure`] - Sites with species labels and sublattice properties, plus structure edits
//! - [`composition`] - Ordered species amounts with reduced and fractional forms
//!
//! ## Usage
//!
//! ```ignore
//! use prlstructure::core::models::{lattice::Lattice, structure::Structure};
//!
//! let lattice = Lattice::cubic(2.87)?;
//! let mut bcc = Structure::from_species_and_coords(
//!     lattice,
//!     &["Fe", "Fe"],
//!     &[[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
//! );
//! bcc.scale_lattice(24.0)?;
//! ```

pub mod composition;
pub mod element;
pub mod lattice;
pub mod structure;
