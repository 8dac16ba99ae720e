//! Analysis modules.
//!
//! Score normalization per artifact kind and per-project aggregation.

pub mod aggregator;
pub mod scoring;

pub use aggregator::*;
