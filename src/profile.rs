//! Reduction of a frame to a background-subtracted 1-D intensity profile.
//!
//! A horizontal band around the vertical midline is collapsed to one value
//! per column with the per-column median, which keeps cosmic rays and hot
//! pixels inside the band from leaking into the profile. The background is a
//! constant fitted by linear least squares through the sigma-clipped quiet
//! samples of the raw profile.

use crate::fitting::linear_fit;
use crate::frame::Frame;
use crate::stats::{median, sigma_clip};

/// Half-width, in rows, of the band collapsed into the profile.
pub const BAND_HALF_WIDTH: usize = 50;

const BACKGROUND_CLIP_SIGMA: f64 = 1.0;
const BACKGROUND_CLIP_MAXITERS: usize = 5;

/// Background-subtracted intensity profile, one value per image column.
///
/// The index axis is implicit: sample `i` sits at `x = i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    values: Vec<f64>,
}

impl Profile {
    pub fn values(&self) -> &[f64] {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    /// The index axis as floats, for the fitters.
    pub fn x_axis(&self) -> Vec<f64> {
        (0..self.values.len()).map(|i| i as f64).collect()
    }
}

/// Extract the profile of a frame.
///
/// Pure function of the frame's central band: running it twice yields
/// identical profiles.
pub fn extract(frame: &Frame) -> Profile {
    let rows = frame.rows();
    let mid = rows / 2;
    // Clamp the band to the image; frames shorter than the full band keep
    // whatever rows they have.
    let low = mid.saturating_sub(BAND_HALF_WIDTH);
    let high = (mid + BAND_HALF_WIDTH).min(rows);

    let mut raw = Vec::with_capacity(frame.cols());
    let mut column = Vec::with_capacity(high - low);
    for c in 0..frame.cols() {
        column.clear();
        column.extend((low..high).map(|r| frame.row(r)[c]));
        raw.push(median(&column));
    }

    let retained = sigma_clip(&raw, BACKGROUND_CLIP_SIGMA, BACKGROUND_CLIP_MAXITERS);
    let clipped_x: Vec<f64> = retained.iter().map(|&i| i as f64).collect();
    let clipped_values: Vec<f64> = retained.iter().map(|&i| raw[i]).collect();
    let (intercept, slope) = linear_fit(&clipped_x, &clipped_values, Some(0.0));

    let values = raw
        .iter()
        .enumerate()
        .map(|(i, v)| v - (intercept + slope * i as f64))
        .collect();
    Profile { values }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(x: f64, amplitude: f64, mean: f64, stddev: f64) -> f64 {
        amplitude * (-(x - mean) * (x - mean) / (2.0 * stddev * stddev)).exp()
    }

    fn synthetic_frame(rows: usize, cols: usize, background: f64) -> Frame {
        let mut data = Vec::with_capacity(rows * cols);
        for _ in 0..rows {
            for c in 0..cols {
                data.push(background + gaussian(c as f64, 500.0, cols as f64 / 2.0, 5.0));
            }
        }
        Frame::new("synthetic", data, rows, cols)
    }

    #[test]
    fn constant_frame_yields_flat_zero_profile() {
        let frame = Frame::new("flat", vec![3.5; 100 * 200], 100, 200);
        let profile = extract(&frame);
        assert_eq!(profile.len(), 200);
        assert!(profile.values().iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn background_is_removed() {
        let frame = synthetic_frame(100, 1000, 120.0);
        let profile = extract(&frame);
        // Far from the feature the profile sits at zero, at the feature it
        // keeps the full amplitude.
        assert!(profile.values()[10].abs() < 1.0);
        assert!((profile.values()[500] - 500.0).abs() < 1.0);
    }

    #[test]
    fn band_clamps_on_short_frames() {
        let frame = synthetic_frame(40, 64, 10.0);
        let profile = extract(&frame);
        assert_eq!(profile.len(), 64);
        assert!(profile.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn extraction_is_idempotent() {
        let frame = synthetic_frame(100, 300, 50.0);
        assert_eq!(extract(&frame), extract(&frame));
    }
}
