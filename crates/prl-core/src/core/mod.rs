//! # Core Module
//!
//! The stateless foundation of PRLStructure: crystal structure models, symmetry analysis, file
//! formats and the SQS database.
//!
//! ## Architecture
//!
//! - **Structure Representation** ([`models`]) - Elements, lattices, sites, structures and compositions
//! - **Symmetry** ([`symmetry`]) - Space group, orbits of equivalent atoms and Wyckoff letters from moyo
//! - **File I/O** ([`io`]) - POSCAR and pymatgen-style JSON documents
//! - **SQS Storage** ([`database`]) - TinyDB-compatible list store of abstract SQS and its query
//!
//! Nothing in this module knows about sublattice models; that bookkeeping lives in
//! [`crate::engine`].

pub mod database;
pub mod io;
pub mod models;
pub mod symmetry;
