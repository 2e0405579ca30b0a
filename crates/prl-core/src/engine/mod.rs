//! # Engine Module
//!
//! Sublattice bookkeeping and substitution machinery built on top of [`crate::core`].
//!
//! ## Overview
//!
//! The engine turns symmetry information into sublattice models and turns sublattice models back
//! into concrete structures. It owns the density-based volume scaling used whenever species are
//! swapped, and the typed configurations consumed by the workflows.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Typed settings and builders for every workflow
//! - **Sublattice Models** ([`sublattice`]) - Species, occupancies and site ratios per sublattice
//! - **Substitution** ([`substitution`]) - Replacement dicts, density tables and volume scaling
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - The engine error type aggregating all lower layers

pub mod config;
pub mod error;
pub mod progress;
pub mod sublattice;
pub mod substitution;
pub(crate) mod utils;
