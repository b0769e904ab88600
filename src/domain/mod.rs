//! Domain layer types and invariants.

pub mod options;
pub mod sites;
