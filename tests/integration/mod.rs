//! Integration test modules for microloop

pub mod choke;
pub mod freeze;
pub mod stutter;
pub mod transport;
