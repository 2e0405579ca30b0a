//! # PRLStructure Core Library
//!
//! Generation of crystal structures for sublattice models used in CALPHAD-style thermodynamic
//! modelling: symmetry-derived sublattices, endmembers, dilute substitutions and special
//! quasirandom structures.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `Lattice`, `Element`),
//!   the moyo-backed symmetry analyzer, POSCAR/JSON I/O and the SQS database.
//!
//! - **[`engine`]: The Logic Core.** Sublattice models, species substitution with density-based
//!   volume scaling, typed configurations and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (`endmember`, `dilute`, `sqs`) that tie
//!   the `engine` and `core` together behind a single `run` entry point each.

pub mod core;
pub mod engine;
pub mod workflows;
