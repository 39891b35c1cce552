//! Local-maximum feature detection in a profile.

use crate::profile::Profile;

/// Fraction of the profile maximum added to its minimum to form the noise
/// threshold. Not user-configurable.
pub const RELATIVE_THRESHOLD: f64 = 0.03;

/// Number of samples on each side a peak must strictly dominate.
pub const DETECTION_WINDOW: usize = 5;

/// A detected feature: profile index and the amplitude of the
/// background-subtracted profile at that index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub position: usize,
    pub amplitude: f64,
}

/// Detect peaks in a profile, ordered by ascending position.
///
/// Samples at or below `min + 0.03 * max` are zeroed first, so noise-level
/// fluctuations cannot form local maxima; a sample is then a peak only if it
/// is strictly greater than every sample within [`DETECTION_WINDOW`] on both
/// sides (window clamped at the profile edges). Flat plateaus never qualify.
/// Amplitudes are read from the unthresholded profile.
pub fn detect(profile: &Profile) -> Vec<Peak> {
    let values = profile.values();
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let threshold = min + RELATIVE_THRESHOLD * max;

    let filtered: Vec<f64> = values
        .iter()
        .map(|&v| if v > threshold { v } else { 0.0 })
        .collect();

    let n = filtered.len();
    let mut peaks = Vec::new();
    for i in 0..n {
        let low = i.saturating_sub(DETECTION_WINDOW);
        let high = (i + DETECTION_WINDOW + 1).min(n);
        let is_peak = (low..high)
            .filter(|&j| j != i)
            .all(|j| filtered[i] > filtered[j]);
        if is_peak {
            peaks.push(Peak {
                position: i,
                amplitude: values[i],
            });
        }
    }
    log::debug!("found {} peak(s)", peaks.len());
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::profile;

    fn gaussian(x: f64, amplitude: f64, mean: f64, stddev: f64) -> f64 {
        amplitude * (-(x - mean) * (x - mean) / (2.0 * stddev * stddev)).exp()
    }

    fn frame_from_profile(values: &[f64]) -> Frame {
        let rows = 100;
        let mut data = Vec::with_capacity(rows * values.len());
        for _ in 0..rows {
            data.extend_from_slice(values);
        }
        Frame::new("synthetic", data, rows, values.len())
    }

    #[test]
    fn single_gaussian_yields_one_peak_at_center() {
        let values: Vec<f64> = (0..1000)
            .map(|x| gaussian(x as f64, 500.0, 500.0, 5.0))
            .collect();
        let profile = profile::extract(&frame_from_profile(&values));
        let peaks = detect(&profile);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].position, 500);
        assert!((peaks[0].amplitude - profile.values()[500]).abs() < 1e-12);
    }

    #[test]
    fn flat_profile_has_no_peaks() {
        let profile = profile::extract(&frame_from_profile(&vec![7.0; 300]));
        assert!(detect(&profile).is_empty());
    }

    #[test]
    fn equally_spaced_features_do_not_exceed_count() {
        let n = 20;
        let centers: Vec<f64> = (0..n).map(|i| 30.0 + 940.0 * i as f64 / (n - 1) as f64).collect();
        let values: Vec<f64> = (0..1000)
            .map(|x| {
                centers
                    .iter()
                    .enumerate()
                    .map(|(k, &c)| gaussian(x as f64, 200.0 + 90.0 * k as f64, c, 5.0))
                    .sum()
            })
            .collect();
        let profile = profile::extract(&frame_from_profile(&values));
        let peaks = detect(&profile);
        assert!(!peaks.is_empty());
        assert!(peaks.len() <= n);
        let positions: Vec<usize> = peaks.iter().map(|p| p.position).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn detection_is_idempotent() {
        let values: Vec<f64> = (0..500)
            .map(|x| gaussian(x as f64, 80.0, 130.0, 4.0) + gaussian(x as f64, 120.0, 370.0, 6.0))
            .collect();
        let profile = profile::extract(&frame_from_profile(&values));
        assert_eq!(detect(&profile), detect(&profile));
    }
}
