//! Outer iterate/update loop shared by both fitting procedures.
//!
//! Each iteration hands the model's current flattened weights to the solver
//! as the start point and writes the optimized point back through
//! `update_weights_from_vec`. Later iterations therefore restart the solver
//! from the previous optimum rather than from scratch; a failed iteration
//! aborts the loop with the store at its last successful update.

use crate::domain::FitConfig;
use crate::error::Result;
use crate::fit::solver::Minimizer;
use crate::models::MixtureModel;

pub(crate) fn refine(
    model: &mut MixtureModel,
    minimizer: &dyn Minimizer,
    objective: &dyn Fn(&[f64]) -> f64,
    config: &FitConfig,
    label: &str,
) -> Result<()> {
    if !model.is_synchronized() {
        log::warn!(
            "{label}: component counts changed since the weights were initialized; \
             only the {} stored components are fitted",
            model.weights_vec_id().len()
        );
    }

    let bounds = config.resolved_bounds(model.weights_vec_id().len());
    for i in 0..config.iters {
        if config.verbose {
            log::info!("Iteration: {} / {}", i + 1, config.iters);
        }
        let min = minimizer.minimize(objective, model.weights_vec(), &bounds)?;
        log::debug!(
            "{label}: iteration {} loss={:.6e} evaluations={}",
            i + 1,
            min.value,
            min.evaluations
        );
        model.update_weights_from_vec(&min.x, None)?;
    }
    Ok(())
}
