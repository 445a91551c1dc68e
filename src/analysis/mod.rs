//! Analysis modules.
//!
//! Grouping of passenger records and the conclusions drawn from the
//! resulting tables.

pub mod aggregator;
pub mod insights;

pub use aggregator::*;
pub use insights::*;
