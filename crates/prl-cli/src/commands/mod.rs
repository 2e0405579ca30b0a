pub mod dilute;
pub mod endmembers;
pub mod sqs;
pub mod sublattice;
