//! Analysis modules.
//!
//! Everything here is a pure function of a loaded score table.

pub mod aggregator;

pub use aggregator::*;
