//! Non-blind kernel fit.
//!
//! Given a registered sharp/blurred image pair, find mixture parameters whose
//! kernel reproduces the blur:
//!
//! ```text
//! L(P) = ‖ filter2d(sharp, K(P)) - blur ‖₂
//! K(P)[i, j] = Σ_k psf_k(w[j]² + h[i]²; a_k, b_k)
//! ```
//!
//! The squared-radius grid is computed once per fit; every objective call only
//! re-evaluates the active components on it.

use nalgebra::DMatrix;

use crate::domain::FitConfig;
use crate::error::{PsfError, Result};
use crate::fit::refine::refine;
use crate::fit::solver::{BoundedBfgs, Minimizer};
use crate::math::filter::correlate;
use crate::math::radius_squared_grid;
use crate::models::{BasisShape, MixtureModel, ShapeKind};

/// Immutable inputs of the kernel objective.
#[derive(Debug, Clone)]
pub struct KernelObjective<'a> {
    sharp: &'a DMatrix<f64>,
    blur: &'a DMatrix<f64>,
    radius2: DMatrix<f64>,
    kinds: Vec<Option<ShapeKind>>,
}

impl<'a> KernelObjective<'a> {
    pub fn new(
        sharp: &'a DMatrix<f64>,
        blur: &'a DMatrix<f64>,
        w_domain: &[f64],
        h_domain: &[f64],
        kinds: Vec<Option<ShapeKind>>,
    ) -> Result<Self> {
        if sharp.is_empty() {
            return Err(PsfError::InvalidInput("sharp image is empty".to_string()));
        }
        if sharp.shape() != blur.shape() {
            return Err(PsfError::shape(format!(
                "sharp image is {:?} but blurred image is {:?}",
                sharp.shape(),
                blur.shape()
            )));
        }
        if w_domain.is_empty() || h_domain.is_empty() {
            return Err(PsfError::InvalidInput(
                "kernel sampling domains must not be empty".to_string(),
            ));
        }
        Ok(Self {
            sharp,
            blur,
            radius2: radius_squared_grid(w_domain, h_domain),
            kinds,
        })
    }

    /// Kernel induced by the candidate vector `params`.
    pub fn kernel(&self, params: &[f64]) -> DMatrix<f64> {
        let mut kernel = DMatrix::zeros(self.radius2.nrows(), self.radius2.ncols());
        for (pair, kind) in params.chunks_exact(2).zip(&self.kinds) {
            let Some(kind) = kind else { continue };
            let shape = BasisShape::from_pair(*kind, [pair[0], pair[1]]);
            for (k, &r2) in kernel.iter_mut().zip(self.radius2.iter()) {
                *k += shape.psf(r2);
            }
        }
        kernel
    }

    /// Euclidean distance between the re-blurred sharp image and the observed blur.
    pub fn loss(&self, params: &[f64]) -> f64 {
        // `new` rejected empty images, empty domains and mismatched shapes.
        let estimate = correlate(self.sharp, &self.kernel(params));
        debug_assert_eq!(estimate.shape(), self.blur.shape());
        (estimate - self.blur).norm()
    }
}

impl MixtureModel {
    /// Fit the mixture so that `sharp` filtered with its kernel matches `blur`.
    pub fn fit_nonblind(
        &mut self,
        sharp: &DMatrix<f64>,
        blur: &DMatrix<f64>,
        w_domain: &[f64],
        h_domain: &[f64],
        config: &FitConfig,
    ) -> Result<()> {
        let solver = BoundedBfgs::new(config.solver);
        self.fit_nonblind_with(&solver, sharp, blur, w_domain, h_domain, config)
    }

    /// Same as [`MixtureModel::fit_nonblind`] with a caller-chosen minimizer.
    pub fn fit_nonblind_with(
        &mut self,
        minimizer: &dyn Minimizer,
        sharp: &DMatrix<f64>,
        blur: &DMatrix<f64>,
        w_domain: &[f64],
        h_domain: &[f64],
        config: &FitConfig,
    ) -> Result<()> {
        let objective = KernelObjective::new(sharp, blur, w_domain, h_domain, self.component_kinds())?;
        let loss = |p: &[f64]| objective.loss(p);
        refine(self, minimizer, &loss, config, "fit_nonblind")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    use crate::data::{blurred_pair, random_image};
    use crate::math::linspace;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn erf_model(a: f64, b: f64) -> MixtureModel {
        let mut model = MixtureModel::new();
        model.add_initialize(1, vec![[a, b]], ShapeKind::Erf, "erf").unwrap();
        model
    }

    #[test]
    fn objective_kernel_matches_model_kernel() {
        let mut model = erf_model(0.1, 0.6);
        model
            .add_initialize(1, vec![[0.05, 1.5]], ShapeKind::Algebraic, "alg")
            .unwrap();
        model.add(0, ShapeKind::Arctan, "off");
        let sharp = random_image(8, 8, 1);
        let w = linspace(-2.0, 2.0, 5);
        let h = linspace(-1.0, 1.0, 3);
        let objective = KernelObjective::new(&sharp, &sharp, &w, &h, model.component_kinds()).unwrap();

        let k = objective.kernel(model.weights_vec());
        let expected = model.kernel(&w, &h);
        assert_eq!(k.shape(), (3, 5));
        for (a, b) in k.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn loss_vanishes_for_generating_kernel() {
        let truth = erf_model(0.1, 0.6);
        let w = linspace(-2.0, 2.0, 5);
        let sharp = random_image(16, 16, 3);
        let blur = blurred_pair(&truth, &sharp, &w, &w).unwrap();
        let objective = KernelObjective::new(&sharp, &blur, &w, &w, truth.component_kinds()).unwrap();
        assert!(objective.loss(truth.weights_vec()) < 1e-12);
        assert!(objective.loss(&[0.05, 1.0]) > 1e-3);
    }

    #[test]
    fn recovers_erf_kernel_from_image_pair() {
        init_logs();
        let (a, b) = (0.1, 0.6);
        let truth = erf_model(a, b);
        let w = linspace(-2.0, 2.0, 5);
        let sharp = random_image(20, 20, 11);
        let blur = blurred_pair(&truth, &sharp, &w, &w).unwrap();

        let mut model = erf_model(0.05, 1.0);
        let config = FitConfig::default().with_iters(4).verbose(true);
        model.fit_nonblind(&sharp, &blur, &w, &w, &config).unwrap();

        let fitted = model.weights()["erf"][0];
        assert!((fitted[0] - a).abs() < 1e-2, "amplitude {}", fitted[0]);
        assert!((fitted[1] - b).abs() < 1e-2, "scale {}", fitted[1]);
    }

    #[test]
    fn inert_rows_do_not_change_the_loss() {
        let truth = erf_model(0.1, 0.6);
        let w = linspace(-2.0, 2.0, 5);
        let sharp = random_image(12, 12, 4);
        let blur = blurred_pair(&truth, &sharp, &w, &w).unwrap();

        let mut model = MixtureModel::new();
        model.add(1, ShapeKind::Erf, "erf").add(-1, ShapeKind::Algebraic, "off");
        model
            .initialize(Some(IndexMap::from([
                ("erf".to_string(), vec![[0.2, 1.1]]),
                ("off".to_string(), vec![[40.0, 0.2]]),
            ])))
            .unwrap();
        assert_eq!(model.kernel(&w, &w), erf_model(0.2, 1.1).kernel(&w, &w));

        let with_inert = KernelObjective::new(&sharp, &blur, &w, &w, model.component_kinds()).unwrap();
        let alone = KernelObjective::new(&sharp, &blur, &w, &w, vec![Some(ShapeKind::Erf)]).unwrap();
        assert_eq!(with_inert.loss(model.weights_vec()), alone.loss(&[0.2, 1.1]));
        assert!(with_inert.loss(&[0.1, 0.6, 40.0, 0.2]) < 1e-12);
    }

    #[test]
    fn rectangular_kernel_grid_is_supported() {
        let truth = erf_model(0.2, 0.8);
        let w = linspace(-3.0, 3.0, 7);
        let h = linspace(-1.0, 1.0, 3);
        let sharp = random_image(12, 10, 5);
        let blur = blurred_pair(&truth, &sharp, &w, &h).unwrap();

        let mut model = erf_model(0.1, 1.0);
        let objective = KernelObjective::new(&sharp, &blur, &w, &h, model.component_kinds()).unwrap();
        let before = objective.loss(model.weights_vec());
        model
            .fit_nonblind(&sharp, &blur, &w, &h, &FitConfig::default().with_iters(2))
            .unwrap();
        let after = objective.loss(model.weights_vec());
        assert!(after < 0.1 * before, "loss {before} -> {after}");
    }

    #[test]
    fn rejects_mismatched_images() {
        let mut model = erf_model(0.1, 1.0);
        let sharp = random_image(8, 8, 0);
        let blur = random_image(8, 9, 0);
        let w = [-1.0, 0.0, 1.0];
        let err = model
            .fit_nonblind(&sharp, &blur, &w, &w, &FitConfig::default())
            .unwrap_err();
        assert!(matches!(err, PsfError::ShapeMismatch(_)));

        let err = model
            .fit_nonblind(&sharp, &sharp, &[], &w, &FitConfig::default())
            .unwrap_err();
        assert!(matches!(err, PsfError::InvalidInput(_)));
    }
}
