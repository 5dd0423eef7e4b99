//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - family identifiers and weight pairs (`FamilyId`, `WeightPair`)
//! - solver bounds (`Bound`, `default_bounds`)
//! - fit configuration (`FitConfig`, `SolverConfig`)
//! - serializable model captures (`WeightSnapshot`)

pub mod types;

pub use types::*;
