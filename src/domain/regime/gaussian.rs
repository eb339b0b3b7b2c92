//! Multivariate Gaussian with full covariance, evaluated through its
//! Cholesky factor.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct MultivariateGaussian {
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
    /// Lower-triangular L with L * L^T = covariance.
    chol: Array2<f64>,
    log_det: f64,
}

impl MultivariateGaussian {
    /// Returns `None` when the covariance is not positive definite.
    pub fn new(mean: Array1<f64>, covariance: Array2<f64>) -> Option<Self> {
        let chol = cholesky(&covariance)?;
        let log_det = 2.0 * chol.diag().iter().map(|v| v.ln()).sum::<f64>();
        Some(Self {
            mean,
            covariance,
            chol,
            log_det,
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn log_pdf(&self, x: ArrayView1<f64>) -> f64 {
        let d = self.dim();
        let diff = &x - &self.mean;

        // forward substitution: L y = diff, quad form = |y|^2
        let mut y = Array1::<f64>::zeros(d);
        for i in 0..d {
            let mut s = diff[i];
            for k in 0..i {
                s -= self.chol[[i, k]] * y[k];
            }
            y[i] = s / self.chol[[i, i]];
        }
        let quad = y.dot(&y);

        -0.5 * (d as f64 * (2.0 * PI).ln() + self.log_det + quad)
    }
}

fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let d = a.nrows();
    if d == 0 || a.ncols() != d {
        return None;
    }
    let mut l = Array2::<f64>::zeros((d, d));
    for i in 0..d {
        for j in 0..=i {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if !(s > 0.0) || !s.is_finite() {
                    return None;
                }
                l[[i, j]] = s.sqrt();
            } else {
                l[[i, j]] = s / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Weighted mean and covariance of the rows of `samples`, with `min_covar`
/// added to the diagonal. `None` when the weights carry no mass.
pub fn weighted_moments(
    samples: ArrayView2<f64>,
    weights: ArrayView1<f64>,
    min_covar: f64,
) -> Option<(Array1<f64>, Array2<f64>)> {
    let d = samples.ncols();
    let weight_sum = weights.sum();
    if !(weight_sum > 1e-10) {
        return None;
    }

    let mut mean = Array1::<f64>::zeros(d);
    for (row, &w) in samples.rows().into_iter().zip(weights.iter()) {
        mean.scaled_add(w, &row);
    }
    mean /= weight_sum;

    let mut cov = Array2::<f64>::zeros((d, d));
    for (row, &w) in samples.rows().into_iter().zip(weights.iter()) {
        let diff = &row - &mean;
        for i in 0..d {
            for j in 0..d {
                cov[[i, j]] += w * diff[i] * diff[j];
            }
        }
    }
    cov /= weight_sum;
    for i in 0..d {
        cov[[i, i]] += min_covar;
    }

    Some((mean, cov))
}
