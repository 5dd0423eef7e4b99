//! Sampling domains and coordinate grids.
//!
//! Kernels are sampled on the Cartesian product of two 1-D coordinate
//! sequences. Grids are laid out the way images are: rows follow `h`,
//! columns follow `w`.

use nalgebra::DMatrix;

/// `n` evenly spaced points from `start` to `stop` (both inclusive).
///
/// `n = 1` yields `[start]`; `n = 0` yields an empty vector.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Default sampling domain for an `n`-sample edge profile.
///
/// `n` points spanning `[-floor(n/2), floor(n/2)]`; integer-spaced for odd `n`.
pub fn centered_domain(n: usize) -> Vec<f64> {
    let half = (n / 2) as f64;
    linspace(-half, half, n)
}

/// Squared radius `w[j]^2 + h[i]^2` at every cell of the `(h.len(), w.len())` grid.
pub fn radius_squared_grid(w_domain: &[f64], h_domain: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(h_domain.len(), w_domain.len(), |i, j| {
        w_domain[j] * w_domain[j] + h_domain[i] * h_domain[i]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(-1.0, 1.0, 5);
        assert_eq!(v, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(linspace(3.0, 7.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn centered_domain_is_symmetric() {
        assert_eq!(centered_domain(5), vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        let even = centered_domain(4);
        assert_eq!(even.len(), 4);
        assert!((even[0] + 2.0).abs() < 1e-12 && (even[3] - 2.0).abs() < 1e-12);
        assert_eq!(centered_domain(1), vec![0.0]);
    }

    #[test]
    fn radius_grid_shape_and_values() {
        let w = [-1.0, 0.0, 1.0, 2.0];
        let h = [0.0, 3.0];
        let z = radius_squared_grid(&w, &h);
        assert_eq!(z.shape(), (2, 4));
        assert_eq!(z[(0, 3)], 4.0);
        assert_eq!(z[(1, 0)], 10.0);
        assert_eq!(z[(1, 1)], 9.0);
    }
}
