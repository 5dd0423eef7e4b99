//! Mixture fitting.
//!
//! Responsibilities:
//!
//! - bound-constrained minimization behind the `Minimizer` trait
//! - direct fit to a 1-D edge profile (`MixtureModel::fit_to_esf`)
//! - non-blind kernel fit to a sharp/blurred image pair (`MixtureModel::fit_nonblind`)

pub mod esf;
pub mod nonblind;
mod refine;
pub mod solver;

pub use esf::*;
pub use nonblind::*;
pub use solver::*;
