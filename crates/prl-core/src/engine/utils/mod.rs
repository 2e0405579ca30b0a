//! Utility functions for the engine module.
//!
//! Combinatorial helpers shared by the endmember, dilute and SQS workflows.

pub mod combinatorics;
