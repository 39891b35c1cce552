//! Linear and nonlinear least-squares fitting on top of nalgebra.
//!
//! The linear side is plain SVD least squares over a design matrix; the
//! nonlinear side is a damped Gauss-Newton (Levenberg-Marquardt) loop over a
//! [`Parametric`] model. Neither path signals failure: a fit that cannot
//! improve returns the best parameters seen so far, and quality is judged
//! downstream from the fitted values.

use nalgebra::{DMatrix, DVector};

const SVD_EPSILON: f64 = 1e-12;

/// Minimum-norm least-squares solution of `design * x = rhs`.
pub fn lstsq(design: &DMatrix<f64>, rhs: &DVector<f64>) -> DVector<f64> {
    match design.clone().svd(true, true).solve(rhs, SVD_EPSILON) {
        Ok(solution) => solution,
        Err(_) => DVector::zeros(design.ncols()),
    }
}

/// Least-squares polynomial of fixed `degree`; coefficients in ascending
/// order of power. Underdetermined systems return the minimum-norm solution.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Vec<f64> {
    let design = DMatrix::from_fn(x.len(), degree + 1, |i, j| x[i].powi(j as i32));
    let rhs = DVector::from_column_slice(y);
    lstsq(&design, &rhs).iter().copied().collect()
}

/// Evaluate a polynomial with ascending coefficients at `x`.
pub fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Straight-line least squares, `y = intercept + slope * x`, with an
/// optionally frozen slope. Returns `(intercept, slope)`.
pub fn linear_fit(x: &[f64], y: &[f64], frozen_slope: Option<f64>) -> (f64, f64) {
    match frozen_slope {
        Some(slope) => {
            let design = DMatrix::from_element(x.len(), 1, 1.0);
            let rhs = DVector::from_iterator(x.len(), x.iter().zip(y).map(|(x, y)| y - slope * x));
            (lstsq(&design, &rhs)[0], slope)
        }
        None => {
            let design = DMatrix::from_fn(x.len(), 2, |i, j| if j == 0 { 1.0 } else { x[i] });
            let rhs = DVector::from_column_slice(y);
            let solution = lstsq(&design, &rhs);
            (solution[0], solution[1])
        }
    }
}

/// A parametric 1-D model with analytic partial derivatives.
pub trait Parametric {
    fn param_count(&self) -> usize;
    fn value(&self, x: f64, params: &[f64]) -> f64;
    /// Partial derivatives of the model value with respect to each parameter,
    /// written into `grad` (length `param_count`).
    fn gradient(&self, x: f64, params: &[f64], grad: &mut [f64]);
}

/// Levenberg-Marquardt settings.
#[derive(Debug, Clone)]
pub struct LevMar {
    pub max_iterations: usize,
    pub convergence_threshold: f64,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
}

impl Default for LevMar {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_threshold: 1e-10,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

impl LevMar {
    /// Fit `model` to the `(x, y)` samples starting from `initial`.
    ///
    /// Always returns a parameter vector: on non-convergence the best
    /// parameters seen so far come back and the caller decides from the
    /// fitted values whether they are usable.
    pub fn fit<M: Parametric>(&self, model: &M, initial: &[f64], x: &[f64], y: &[f64]) -> Vec<f64> {
        let k = model.param_count();
        let n = x.len();
        let mut params = initial.to_vec();
        let mut lambda = self.initial_lambda;
        let mut chi2 = chi_squared(model, &params, x, y);

        for _ in 0..self.max_iterations {
            let mut jacobian = DMatrix::zeros(n, k);
            let mut residuals = DVector::zeros(n);
            let mut grad = vec![0.0; k];
            for i in 0..n {
                model.gradient(x[i], &params, &mut grad);
                for j in 0..k {
                    jacobian[(i, j)] = grad[j];
                }
                residuals[i] = y[i] - model.value(x[i], &params);
            }

            let mut damped = &jacobian.transpose() * &jacobian;
            for j in 0..k {
                damped[(j, j)] *= 1.0 + lambda;
            }
            let gradient = jacobian.transpose() * &residuals;
            let delta = match damped.svd(true, true).solve(&gradient, SVD_EPSILON) {
                Ok(delta) => delta,
                Err(_) => break,
            };

            let trial: Vec<f64> = params.iter().zip(delta.iter()).map(|(p, d)| p + d).collect();
            let trial_chi2 = chi_squared(model, &trial, x, y);
            if trial_chi2 < chi2 {
                params = trial;
                chi2 = trial_chi2;
                lambda *= self.lambda_down;
                if delta.amax() < self.convergence_threshold {
                    break;
                }
            } else {
                lambda *= self.lambda_up;
                if lambda > 1e10 {
                    break;
                }
            }
        }
        params
    }
}

fn chi_squared<M: Parametric>(model: &M, params: &[f64], x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&x, &y)| {
            let r = y - model.value(x, params);
            r * r
        })
        .sum()
}
