//! Focus-curve fitting and best-focus location.

use serde::Serialize;

use crate::fitting::{polyfit, polyval};

/// Degree of the polynomial fitted to the (focus, FWHM) samples. Fixed, not
/// adaptive: with very few samples the fit is underdetermined but still
/// attempted.
pub const POLYNOMIAL_DEGREE: usize = 5;

/// Number of evenly spaced focus values scanned for the stationary point.
pub const SCAN_SAMPLES: usize = 2000;

/// One successfully measured exposure: file label, representative FWHM and
/// the focus position it was taken at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusSample {
    pub label: String,
    pub fwhm: f64,
    pub focus: f64,
}

/// Polynomial fitted to a configuration group's focus sequence, together
/// with the derived best focus.
#[derive(Debug, Clone)]
pub struct FocusCurve {
    coefficients: Vec<f64>,
    span: (f64, f64),
    best_focus: f64,
    best_fwhm: f64,
    best_sample: FocusSample,
}

impl FocusCurve {
    /// Fit the focus curve of one configuration group.
    ///
    /// `samples` must hold at least one element (the caller guarantees it);
    /// results with fewer than about 6 samples are degraded but defined.
    ///
    /// The best focus is located by scanning the fitted polynomial at
    /// [`SCAN_SAMPLES`] points across the observed focus span and taking the
    /// point whose finite-difference derivative is smallest in magnitude.
    /// This is a stationary point; it is not verified to be a true minimum.
    pub fn fit(samples: &[FocusSample]) -> Self {
        let focus: Vec<f64> = samples.iter().map(|s| s.focus).collect();
        let fwhm: Vec<f64> = samples.iter().map(|s| s.fwhm).collect();
        let coefficients = polyfit(&focus, &fwhm, POLYNOMIAL_DEGREE);

        let x1 = focus.iter().cloned().fold(f64::INFINITY, f64::min);
        let x2 = focus.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let step = (x2 - x1) / (SCAN_SAMPLES - 1) as f64;
        let grid: Vec<f64> = (0..SCAN_SAMPLES).map(|i| x1 + step * i as f64).collect();
        let modeled: Vec<f64> = grid.iter().map(|&x| polyval(&coefficients, x)).collect();

        let mut index_of_minimum = 0;
        let mut smallest = f64::INFINITY;
        for i in 0..SCAN_SAMPLES - 1 {
            let derivative = (modeled[i + 1] - modeled[i]) / (grid[i + 1] - grid[i]);
            if derivative.abs() < smallest {
                smallest = derivative.abs();
                index_of_minimum = i;
            }
        }
        let best_focus = grid[index_of_minimum];
        let best_fwhm = modeled[index_of_minimum];

        let nearest = samples
            .iter()
            .min_by(|a, b| {
                (a.focus - best_focus)
                    .abs()
                    .total_cmp(&(b.focus - best_focus).abs())
            })
            .expect("at least one focus sample");

        Self {
            coefficients,
            span: (x1, x2),
            best_focus,
            best_fwhm,
            best_sample: nearest.clone(),
        }
    }

    /// Fitted polynomial value at `x`.
    pub fn value(&self, x: f64) -> f64 {
        polyval(&self.coefficients, x)
    }

    /// Observed focus span, `(min, max)`.
    pub fn span(&self) -> (f64, f64) {
        self.span
    }

    pub fn best_focus(&self) -> f64 {
        self.best_focus
    }

    pub fn best_fwhm(&self) -> f64 {
        self.best_fwhm
    }

    /// The input sample whose focus value is nearest the best focus.
    pub fn best_sample(&self) -> &FocusSample {
        &self.best_sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: &str, fwhm: f64, focus: f64) -> FocusSample {
        FocusSample {
            label: label.to_owned(),
            fwhm,
            focus,
        }
    }

    #[test]
    fn locates_the_minimum_of_a_parabola() {
        let samples: Vec<FocusSample> = (0..21)
            .map(|i| {
                let focus = -2000.0 + 200.0 * i as f64;
                let fwhm = 5.0 + 1e-6 * (focus - 300.0) * (focus - 300.0);
                sample(&format!("file_{}.fits", i + 1), fwhm, focus)
            })
            .collect();
        let curve = FocusCurve::fit(&samples);
        let resolution = 4000.0 / SCAN_SAMPLES as f64;
        assert!((curve.best_focus() - 300.0).abs() <= 2.0 * resolution);
        assert!((curve.best_fwhm() - 5.0).abs() < 0.01);
    }

    #[test]
    fn best_sample_is_nearest_the_best_focus() {
        let samples: Vec<FocusSample> = (0..11)
            .map(|i| {
                let focus = -500.0 + 100.0 * i as f64;
                sample(&format!("f{}", i), 3.0 + 1e-5 * focus * focus, focus)
            })
            .collect();
        let curve = FocusCurve::fit(&samples);
        assert_eq!(curve.best_sample().label, "f5");
        assert_eq!(curve.best_sample().focus, 0.0);
    }

    #[test]
    fn single_sample_does_not_crash() {
        let curve = FocusCurve::fit(&[sample("only", 4.2, 100.0)]);
        assert_eq!(curve.best_sample().label, "only");
        assert!(curve.best_focus().is_finite());
    }

    #[test]
    fn few_samples_are_degraded_but_defined() {
        let samples = vec![
            sample("a", 5.0, -100.0),
            sample("b", 4.0, 0.0),
            sample("c", 5.5, 100.0),
        ];
        let curve = FocusCurve::fit(&samples);
        let (lo, hi) = curve.span();
        assert!(curve.best_focus() >= lo && curve.best_focus() <= hi);
    }
}
