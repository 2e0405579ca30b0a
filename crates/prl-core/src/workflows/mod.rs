//! # Workflows Module
//!
//! High-level entry points that chain the engine's building blocks into complete structure
//! generation procedures.
//!
//! ## Architecture
//!
//! - **Endmembers** ([`endmember`]) - Sublattice detection, placeholder templates and the
//!   Cartesian product of candidate species
//! - **Dilute Structures** ([`dilute`]) - Single-site substitutions of endmembers, optionally in a
//!   supercell
//! - **SQS** ([`sqs`]) - Abstract SQS from the database made concrete for a sublattice model
//!
//! Every workflow exposes a `run` function taking a typed configuration from
//! [`crate::engine::config`] and a [`crate::engine::progress::ProgressReporter`].

pub mod dilute;
pub mod endmember;
pub mod sqs;
