//! Direct fit of the mixture to an observed 1-D edge profile.
//!
//! Objective for a candidate flattened vector `P = [a0, b0, a1, b1, ...]`:
//!
//! ```text
//! L(P) = Σ_i | Σ_k esf_k(x_i; a_k, b_k) - y_i |
//! ```
//!
//! where `k` runs over the active components and `x_i` over the sampling
//! domain. Absolute residuals keep the fit from being dragged around by a few
//! saturated or clipped samples at the ends of the profile.

use crate::domain::FitConfig;
use crate::error::{PsfError, Result};
use crate::fit::refine::refine;
use crate::fit::solver::{BoundedBfgs, Minimizer};
use crate::math::centered_domain;
use crate::models::{BasisShape, MixtureModel, ShapeKind};

/// Immutable inputs of the edge-profile objective.
#[derive(Debug, Clone)]
pub struct EsfObjective<'a> {
    data: &'a [f64],
    domain: Vec<f64>,
    kinds: Vec<Option<ShapeKind>>,
}

impl<'a> EsfObjective<'a> {
    /// `kinds` holds one entry per component of the flattened vector
    /// (`None` for inert components); `domain` defaults to `centered_domain`.
    pub fn new(
        data: &'a [f64],
        domain: Option<&[f64]>,
        kinds: Vec<Option<ShapeKind>>,
    ) -> Result<Self> {
        if data.is_empty() {
            return Err(PsfError::InvalidInput("edge profile is empty".to_string()));
        }
        let domain = match domain {
            Some(d) if d.len() != data.len() => {
                return Err(PsfError::shape(format!(
                    "edge profile has {} samples but the domain has {}",
                    data.len(),
                    d.len()
                )));
            }
            Some(d) => d.to_vec(),
            None => centered_domain(data.len()),
        };
        Ok(Self { data, domain, kinds })
    }

    pub fn domain(&self) -> &[f64] {
        &self.domain
    }

    /// Summed absolute residual of the candidate vector `params`.
    pub fn loss(&self, params: &[f64]) -> f64 {
        let mut model = vec![0.0; self.domain.len()];
        for (pair, kind) in params.chunks_exact(2).zip(&self.kinds) {
            let Some(kind) = kind else { continue };
            let shape = BasisShape::from_pair(*kind, [pair[0], pair[1]]);
            for (m, &x) in model.iter_mut().zip(&self.domain) {
                *m += shape.esf(x);
            }
        }
        model
            .iter()
            .zip(self.data)
            .map(|(m, y)| (m - y).abs())
            .sum()
    }
}

impl MixtureModel {
    /// Fit the mixture parameters to `data` with the bundled solver.
    ///
    /// `domain` defaults to `[-n/2 .. n/2]` with `n = data.len()`.
    pub fn fit_to_esf(&mut self, data: &[f64], domain: Option<&[f64]>, config: &FitConfig) -> Result<()> {
        let solver = BoundedBfgs::new(config.solver);
        self.fit_to_esf_with(&solver, data, domain, config)
    }

    /// Same as [`MixtureModel::fit_to_esf`] with a caller-chosen minimizer.
    pub fn fit_to_esf_with(
        &mut self,
        minimizer: &dyn Minimizer,
        data: &[f64],
        domain: Option<&[f64]>,
        config: &FitConfig,
    ) -> Result<()> {
        let objective = EsfObjective::new(data, domain, self.component_kinds())?;
        let loss = |p: &[f64]| objective.loss(p);
        refine(self, minimizer, &loss, config, "fit_to_esf")
    }
}
