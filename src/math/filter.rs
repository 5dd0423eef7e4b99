//! Same-size 2-D filtering and array distances.
//!
//! `filter2d` is a correlation of `src` with `kernel`:
//!
//! ```text
//! out(i, j) = Σ_u Σ_v kernel(u, v) · src(i + u - ay, j + v - ax)
//! ```
//!
//! with the anchor `(ay, ax) = (rows / 2, cols / 2)` and out-of-range source
//! indices reflected without repeating the edge sample (`dcb|abcd|cba`).
//! For the radially symmetric kernels built by the mixture this is identical
//! to convolution.

use nalgebra::DMatrix;

use crate::error::{PsfError, Result};

/// Reflect an out-of-range index back into `0..len` (reflect-101).
fn reflect_101(mut p: isize, len: usize) -> usize {
    let n = len as isize;
    if n == 1 {
        return 0;
    }
    loop {
        if p < 0 {
            p = -p;
        } else if p >= n {
            p = 2 * n - 2 - p;
        } else {
            return p as usize;
        }
    }
}

/// Filter `src` with `kernel`, returning an image the same shape as `src`.
pub fn filter2d(src: &DMatrix<f64>, kernel: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if src.is_empty() {
        return Err(PsfError::shape("cannot filter an empty image"));
    }
    if kernel.is_empty() {
        return Err(PsfError::shape("cannot filter with an empty kernel"));
    }
    Ok(correlate(src, kernel))
}

/// [`filter2d`] without the emptiness checks; both arguments must be non-empty.
pub(crate) fn correlate(src: &DMatrix<f64>, kernel: &DMatrix<f64>) -> DMatrix<f64> {
    let (rows, cols) = src.shape();
    let (kh, kw) = kernel.shape();
    let ay = (kh / 2) as isize;
    let ax = (kw / 2) as isize;

    // Precompute reflected source indices per kernel offset.
    let row_idx: Vec<Vec<usize>> = (0..kh)
        .map(|u| {
            (0..rows)
                .map(|i| reflect_101(i as isize + u as isize - ay, rows))
                .collect()
        })
        .collect();
    let col_idx: Vec<Vec<usize>> = (0..kw)
        .map(|v| {
            (0..cols)
                .map(|j| reflect_101(j as isize + v as isize - ax, cols))
                .collect()
        })
        .collect();

    let mut out = DMatrix::<f64>::zeros(rows, cols);
    for u in 0..kh {
        for v in 0..kw {
            let k = kernel[(u, v)];
            if k == 0.0 {
                continue;
            }
            let ri = &row_idx[u];
            let ci = &col_idx[v];
            for j in 0..cols {
                let sj = ci[j];
                for i in 0..rows {
                    out[(i, j)] += k * src[(ri[i], sj)];
                }
            }
        }
    }
    out
}

/// Euclidean (element-wise L2, i.e. Frobenius) norm of `a - b`.
pub fn euclidean_distance(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<f64> {
    if a.shape() != b.shape() {
        return Err(PsfError::shape(format!(
            "cannot compare arrays of shape {:?} and {:?}",
            a.shape(),
            b.shape()
        )));
    }
    Ok((a - b).norm())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_101_mirrors_without_edge_repeat() {
        assert_eq!(reflect_101(-1, 4), 1);
        assert_eq!(reflect_101(-2, 4), 2);
        assert_eq!(reflect_101(4, 4), 2);
        assert_eq!(reflect_101(5, 4), 1);
        assert_eq!(reflect_101(-3, 1), 0);
    }

    #[test]
    fn identity_kernel_preserves_image() {
        let src = DMatrix::from_fn(4, 5, |i, j| (i * 5 + j) as f64);
        let mut k = DMatrix::zeros(3, 3);
        k[(1, 1)] = 1.0;
        let out = filter2d(&src, &k).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn shift_kernel_correlates_not_convolves() {
        // A single tap right of centre reads the right-hand neighbour.
        let src = DMatrix::from_row_slice(1, 4, &[1.0, 2.0, 3.0, 4.0]);
        let k = DMatrix::from_row_slice(1, 3, &[0.0, 0.0, 1.0]);
        let out = filter2d(&src, &k).unwrap();
        assert_eq!(out, DMatrix::from_row_slice(1, 4, &[2.0, 3.0, 4.0, 3.0]));
    }

    #[test]
    fn box_filter_keeps_constant_image_constant() {
        let src = DMatrix::from_element(6, 6, 2.0);
        let k = DMatrix::from_element(3, 3, 1.0 / 9.0);
        let out = filter2d(&src, &k).unwrap();
        for v in out.iter() {
            assert!((v - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn distance_is_frobenius_and_checks_shape() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 3.0, 0.0]);
        assert!((euclidean_distance(&a, &b).unwrap() - 20f64.sqrt()).abs() < 1e-12);
        assert!(euclidean_distance(&a, &DMatrix::zeros(1, 4)).is_err());
    }

    #[test]
    fn distance_is_element_wise_not_spectral() {
        // For an identity difference the two matrix norms disagree: √2 vs 1.
        let a = DMatrix::<f64>::identity(2, 2);
        let b = DMatrix::zeros(2, 2);
        let d = euclidean_distance(&a, &b).unwrap();
        let spectral = (&a - &b).svd(false, false).singular_values.max();
        assert!((d - 2f64.sqrt()).abs() < 1e-12);
        assert!((spectral - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let src = DMatrix::from_element(3, 3, 1.0);
        assert!(filter2d(&DMatrix::zeros(0, 3), &src).is_err());
        assert!(filter2d(&src, &DMatrix::zeros(3, 0)).is_err());
    }
}
