//! `psf-mixture` library crate.
//!
//! Models a point-spread function as a weighted mixture of parametric basis
//! shapes and fits the mixture either to an observed edge profile or to a
//! sharp/blurred image pair:
//!
//! ```no_run
//! use psf_mixture::domain::FitConfig;
//! use psf_mixture::models::{MixtureModel, ShapeKind};
//!
//! # fn main() -> psf_mixture::error::Result<()> {
//! let mut model = MixtureModel::new();
//! model.add(1, ShapeKind::Erf, "erf").add(1, ShapeKind::Arctan, "atan");
//! model.initialize(None)?;
//!
//! let profile = [0.0, 0.05, 0.5, 0.95, 1.0];
//! model.fit_to_esf(&profile, None, &FitConfig::default().with_iters(3))?;
//!
//! let axis = [-2.0, -1.0, 0.0, 1.0, 2.0];
//! let kernel = model.kernel(&axis, &axis);
//! # let _ = kernel;
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
