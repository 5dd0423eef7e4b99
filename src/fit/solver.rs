//! Bound-constrained scalar minimization.
//!
//! Fitting code only depends on the [`Minimizer`] trait: hand it an objective,
//! a start point and one [`Bound`] per coordinate, read back the optimized
//! point. [`BoundedBfgs`] is the bundled implementation, a thin adapter over
//! `wolfe_bfgs::Bfgs` with box constraints.
//!
//! The loss closures used by the fits have no analytic gradient, so the
//! adapter differentiates them numerically with central differences. Stencil
//! points never leave the box: a coordinate sitting on a bound falls back to a
//! one-sided difference.

use std::cell::Cell;

use ndarray::Array1;
use wolfe_bfgs::{Bfgs, BfgsError};

use crate::domain::{Bound, SolverConfig};
use crate::error::{PsfError, Result};

/// Stand-in for an infinite interval end; `Bfgs::with_bounds` wants finite boxes.
pub const OPEN_END: f64 = 1e12;

/// Result of one solver call.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
}

/// A bound-constrained minimizer of `objective` starting from `x0`.
pub trait Minimizer {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        x0: &[f64],
        bounds: &[Bound],
    ) -> Result<Minimum>;
}

/// Projected BFGS with a finite-difference gradient.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundedBfgs {
    config: SolverConfig,
}

impl BoundedBfgs {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

/// Objective wrapper that counts calls and hands `Bfgs` finite samples only.
struct Sampled<'a> {
    objective: &'a dyn Fn(&[f64]) -> f64,
    bounds: &'a [Bound],
    step: f64,
    evaluations: Cell<usize>,
}

impl Sampled<'_> {
    fn value(&self, x: &[f64]) -> f64 {
        self.evaluations.set(self.evaluations.get() + 1);
        (self.objective)(x)
    }

    /// Central-difference gradient, one-sided where the stencil would leave the box.
    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; x.len()];
        let mut shifted = x.to_vec();
        for (i, g) in grad.iter_mut().enumerate() {
            let bound = &self.bounds[i];
            let hi = if bound.contains(x[i] + self.step) { x[i] + self.step } else { x[i] };
            let lo = if bound.contains(x[i] - self.step) { x[i] - self.step } else { x[i] };
            if hi == lo {
                continue;
            }
            shifted[i] = hi;
            let fp = self.value(&shifted);
            shifted[i] = lo;
            let fm = self.value(&shifted);
            shifted[i] = x[i];
            *g = (fp - fm) / (hi - lo);
        }
        grad
    }

    fn sample(&self, x: &Array1<f64>) -> (f64, Array1<f64>) {
        let point = x.to_vec();
        let cost = self.value(&point);
        let grad = self.gradient(&point);
        if cost.is_finite() && grad.iter().all(|g| g.is_finite()) {
            (cost, Array1::from_vec(grad))
        } else {
            invalid_sample(x)
        }
    }
}

/// Large smooth barrier returned where the objective is not finite, so the
/// line search backs off instead of aborting.
fn invalid_sample(x: &Array1<f64>) -> (f64, Array1<f64>) {
    const COST_BARRIER: f64 = 1e50;
    const GRAD_SCALE: f64 = 1e6;

    let mut grad = x.clone();
    for g in grad.iter_mut() {
        if !g.is_finite() || g.abs() < 1e-6 {
            *g = 1.0;
        }
    }
    grad *= GRAD_SCALE;
    (COST_BARRIER + 0.5 * x.dot(x), grad)
}

fn box_limits(bounds: &[Bound]) -> (Array1<f64>, Array1<f64>) {
    let lower = bounds.iter().map(|b| b.low.max(-OPEN_END)).collect();
    let upper = bounds.iter().map(|b| b.high.min(OPEN_END)).collect();
    (lower, upper)
}

impl Minimizer for BoundedBfgs {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        x0: &[f64],
        bounds: &[Bound],
    ) -> Result<Minimum> {
        let n = x0.len();
        if bounds.len() != n {
            return Err(PsfError::solver(format!(
                "{} bounds supplied for {n} parameters",
                bounds.len()
            )));
        }
        if let Some(i) = bounds.iter().position(|b| !b.is_valid()) {
            return Err(PsfError::solver(format!(
                "bound {i} is empty: [{}, {}]",
                bounds[i].low, bounds[i].high
            )));
        }

        let sampled = Sampled {
            objective,
            bounds,
            step: self.config.gradient_step,
            evaluations: Cell::new(0),
        };
        let start: Vec<f64> = x0.iter().zip(bounds).map(|(v, b)| b.clamp(*v)).collect();
        let f_start = sampled.value(&start);
        if !f_start.is_finite() {
            return Err(PsfError::solver(format!(
                "objective is not finite at the start point ({f_start})"
            )));
        }
        if n == 0 {
            return Ok(Minimum {
                x: start,
                value: f_start,
                evaluations: sampled.evaluations.get(),
            });
        }

        let (lower, upper) = box_limits(bounds);
        let mut optimizer =
            Bfgs::new(Array1::from_vec(start.clone()), |x: &Array1<f64>| sampled.sample(x))
                .with_bounds(lower, upper, self.config.bound_tolerance)
                .with_tolerance(self.config.tolerance)
                .with_max_iterations(self.config.max_iters);

        let solution = match optimizer.run() {
            Ok(solution) => solution,
            Err(BfgsError::LineSearchFailed { last_solution, .. }) => {
                log::debug!("line search stopped early; using best-so-far parameters");
                *last_solution
            }
            Err(BfgsError::MaxIterationsReached { last_solution }) => {
                log::debug!(
                    "BFGS hit the iteration cap ({}); using best-so-far parameters",
                    self.config.max_iters
                );
                *last_solution
            }
            Err(e) => return Err(PsfError::solver(format!("BFGS failed: {e:?}"))),
        };

        let x: Vec<f64> = solution
            .final_point
            .iter()
            .zip(bounds)
            .map(|(v, b)| b.clamp(*v))
            .collect();
        let value = sampled.value(&x);
        // Never hand back something worse than where the solver started.
        let (x, value) = if value.is_finite() && value <= f_start {
            (x, value)
        } else {
            (start, f_start)
        };
        Ok(Minimum {
            x,
            value,
            evaluations: sampled.evaluations.get(),
        })
    }
}
