//! Synthetic observations generated from a known mixture.
//!
//! Everything here is deterministic given the seed, so fitted parameters can
//! be compared against the generating ones.

use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::error::{PsfError, Result};
use crate::math::filter2d;
use crate::models::MixtureModel;

/// Sample the mixture edge response over `domain`, plus Gaussian noise.
///
/// `noise_sigma = 0` returns the noiseless profile.
pub fn edge_profile(
    model: &MixtureModel,
    domain: &[f64],
    noise_sigma: f64,
    seed: u64,
) -> Result<DVector<f64>> {
    let mut profile = model.esf_domain(domain);
    if noise_sigma == 0.0 {
        return Ok(profile);
    }

    let normal = Normal::new(0.0, noise_sigma)
        .map_err(|e| PsfError::InvalidInput(format!("Noise distribution error: {e}")))?;
    let mut rng = StdRng::seed_from_u64(seed);
    for v in profile.iter_mut() {
        *v += normal.sample(&mut rng);
    }
    Ok(profile)
}

/// Uniform `[0, 1)` noise image: a sharp scene with energy at every frequency.
pub fn random_image(rows: usize, cols: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(0.0..1.0))
}

/// Blur `sharp` with the model's kernel sampled on `w_domain` x `h_domain`.
pub fn blurred_pair(
    model: &MixtureModel,
    sharp: &DMatrix<f64>,
    w_domain: &[f64],
    h_domain: &[f64],
) -> Result<DMatrix<f64>> {
    filter2d(sharp, &model.kernel(w_domain, h_domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::centered_domain;
    use crate::models::ShapeKind;

    /// Vertical step edge: zero left of `cols / 2`, one from there on.
    fn step_image(rows: usize, cols: usize) -> DMatrix<f64> {
        DMatrix::from_fn(rows, cols, |_, j| if j >= cols / 2 { 1.0 } else { 0.0 })
    }

    fn model() -> MixtureModel {
        let mut m = MixtureModel::new();
        m.add_initialize(1, vec![[1.0, 0.7]], ShapeKind::Arctan, "atan").unwrap();
        m
    }

    #[test]
    fn noiseless_profile_equals_model() {
        let domain = centered_domain(9);
        let p = edge_profile(&model(), &domain, 0.0, 0).unwrap();
        assert_eq!(p, model().esf_domain(&domain));
    }

    #[test]
    fn noisy_profile_is_seeded() {
        let domain = centered_domain(9);
        let a = edge_profile(&model(), &domain, 0.05, 42).unwrap();
        let b = edge_profile(&model(), &domain, 0.05, 42).unwrap();
        let c = edge_profile(&model(), &domain, 0.05, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(edge_profile(&model(), &domain, -1.0, 0).is_err());
    }

    #[test]
    fn random_image_in_unit_range() {
        let img = random_image(5, 7, 9);
        assert_eq!(img.shape(), (5, 7));
        assert!(img.iter().all(|v| (0.0..1.0).contains(v)));
        assert_eq!(img, random_image(5, 7, 9));
    }

    #[test]
    fn blurred_step_is_monotone_across_the_edge() {
        let sharp = step_image(9, 12);
        let w = [-1.0, 0.0, 1.0];
        let blur = blurred_pair(&model(), &sharp, &w, &w).unwrap();
        assert_eq!(blur.shape(), sharp.shape());
        let row = blur.row(4);
        for j in 1..12 {
            assert!(row[j] >= row[j - 1] - 1e-12, "column {j}");
        }
    }
}
