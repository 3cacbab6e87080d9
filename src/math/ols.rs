//! Ordinary least squares.
//!
//! The dashboard fits a single regression per render:
//!
//! ```text
//! target_t = intercept + beta * composite_t + e_t
//! ```
//!
//! Implementation choices:
//! - The design matrix is `[1, x]` and is solved with SVD, which stays robust
//!   for tall matrices (hundreds to ~1500 rows, two columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - A composite series with (numerically) zero variance makes the slope
//!   unidentifiable; that case is reported as `DegenerateRegression` before any
//!   solve is attempted.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::StatError;

use super::negligible_spread;

/// Result of `y ~ 1 + x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionFit {
    pub beta: f64,
    pub intercept: f64,
    /// Coefficient of determination; `None` when `y` itself is constant
    /// (0/0: nothing to explain).
    pub r_squared: Option<f64>,
    pub n_obs: usize,
}

impl RegressionFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.beta * x
    }
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Regress `y` on `x` with an intercept over the full overlapping history.
pub fn regress(x: &[f64], y: &[f64]) -> Result<RegressionFit, StatError> {
    let n = x.len().min(y.len());
    if n < 2 {
        return Err(StatError::DegenerateRegression);
    }
    let (x, y) = (&x[..n], &y[..n]);

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let sxx: f64 = x.iter().map(|v| (v - mean_x).powi(2)).sum();
    let raw_xx: f64 = x.iter().map(|v| v * v).sum();
    if negligible_spread(sxx, raw_xx) {
        tracing::debug!(n, "composite returns have zero variance; regression undefined");
        return Err(StatError::DegenerateRegression);
    }

    let mut design = DMatrix::from_element(n, 2, 1.0);
    for (i, v) in x.iter().enumerate() {
        design[(i, 1)] = *v;
    }
    let target = DVector::from_row_slice(y);

    let coef = solve_least_squares(&design, &target).ok_or(StatError::DegenerateRegression)?;
    let (intercept, beta) = (coef[0], coef[1]);

    let mean_y = y.iter().sum::<f64>() / n as f64;
    let sst: f64 = y.iter().map(|v| (v - mean_y).powi(2)).sum();
    let raw_yy: f64 = y.iter().map(|v| v * v).sum();
    let sse: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - (intercept + beta * xi)).powi(2))
        .sum();

    let r_squared = if negligible_spread(sst, raw_yy) {
        None
    } else {
        Some((1.0 - sse / sst).clamp(0.0, 1.0))
    };

    Ok(RegressionFit {
        beta,
        intercept,
        r_squared,
        n_obs: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn exact_linear_relation_has_unit_r_squared() {
        let x: Vec<f64> = (0..50).map(|i| 0.01 * ((i as f64) * 1.3).cos()).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.0005 + 0.6 * v).collect();

        let fit = regress(&x, &y).unwrap();
        assert!((fit.beta - 0.6).abs() < 1e-9, "beta = {}", fit.beta);
        assert!((fit.intercept - 0.0005).abs() < 1e-9);
        assert!((fit.r_squared.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(fit.n_obs, 50);
    }

    #[test]
    fn noisy_relation_has_partial_r_squared() {
        let x: Vec<f64> = (0..200).map(|i| 0.01 * ((i as f64) * 0.37).sin()).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.2 * v + 0.008 * ((i as f64) * 2.9).cos())
            .collect();

        let fit = regress(&x, &y).unwrap();
        let r2 = fit.r_squared.unwrap();
        assert!(r2 > 0.0 && r2 < 1.0, "r2 = {r2}");
        assert!(fit.beta > 0.5 && fit.beta < 2.0, "beta = {}", fit.beta);
    }

    #[test]
    fn constant_regressor_is_degenerate() {
        let x = vec![0.01; 60];
        let y: Vec<f64> = (0..60).map(|i| 0.001 * i as f64).collect();
        assert_eq!(regress(&x, &y), Err(StatError::DegenerateRegression));
    }

    #[test]
    fn compounded_constant_returns_are_degenerate() {
        // Returns recovered from prices growing 1% per row differ only by rounding.
        let prices: Vec<f64> = (0..60).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let x: Vec<f64> = prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.6 * v).collect();
        assert_eq!(regress(&x, &y), Err(StatError::DegenerateRegression));
    }

    #[test]
    fn constant_target_has_undefined_r_squared() {
        let x: Vec<f64> = (0..30).map(|i| 0.01 * ((i as f64) * 0.9).sin()).collect();
        let y = vec![0.002; 30];
        let fit = regress(&x, &y).unwrap();
        assert!(fit.beta.abs() < 1e-9);
        assert_eq!(fit.r_squared, None);
    }
}
