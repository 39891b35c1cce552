//! Session orchestration: per-frame pipeline, per-group curve fit, result
//! records and CSV export.

use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;

use crate::collection::FocusGroup;
use crate::fitting::LevMar;
use crate::focus::{FocusCurve, FocusSample};
use crate::frame::Frame;
use crate::fwhm::{self, FeaturesModel};
use crate::peaks;
use crate::profile;

#[derive(thiserror::Error, Debug)]
pub enum FocusError {
    #[error("no usable FWHM measurement in configuration {0}")]
    NoUsableSamples(String),
}

/// Best-focus report for one configuration group.
#[derive(Debug, Clone, Serialize)]
pub struct FocusResult {
    pub date: String,
    pub time: String,
    pub mode_name: String,
    pub best_focus: f64,
    pub best_fwhm: f64,
    pub best_image: FocusSample,
    pub focus_series: Vec<f64>,
    pub fwhm_series: Vec<f64>,
    #[serde(skip)]
    pub curve: FocusCurve,
}

impl FocusResult {
    /// One-line summary in the shape the CLI logs.
    pub fn summary(&self) -> String {
        format!(
            "Mode: {} Best Focus: {:.3} at FWHM: {:.3}. Best image: {} with focus: {:.3} and FWHM: {:.3}",
            self.mode_name,
            self.best_focus,
            self.best_fwhm,
            self.best_image.label,
            self.best_image.focus,
            self.best_image.fwhm
        )
    }
}

/// Drives the profile -> peaks -> FWHM pipeline over every frame of every
/// configuration group and fits one focus curve per group.
///
/// The peak-shape family is chosen once per session and reused for every
/// fit; there is no other shared state, so frames are processed in parallel
/// and the samples sorted by focus before curve fitting.
pub struct FocusSession {
    features_model: FeaturesModel,
    fitter: LevMar,
}

impl FocusSession {
    pub fn new(features_model: FeaturesModel) -> Self {
        Self {
            features_model,
            fitter: LevMar::default(),
        }
    }

    /// Measure one frame: profile extraction, peak detection, representative
    /// FWHM. `None` when the frame yields no usable width or has no focus
    /// position in its header.
    pub fn measure_frame(&self, frame: &Frame) -> Option<FocusSample> {
        log::debug!("processing frame: {}", frame.label());
        let profile = profile::extract(frame);
        let detected = peaks::detect(&profile);
        let fwhm =
            match fwhm::representative_fwhm(&profile, &detected, self.features_model, &self.fitter)
            {
                Some(fwhm) => fwhm,
                None => {
                    log::warn!("frame: {} has no usable FWHM", frame.label());
                    return None;
                }
            };
        let focus = match frame.focus() {
            Some(focus) => focus,
            None => {
                log::warn!("frame: {} has no focus position card", frame.label());
                return None;
            }
        };
        log::info!(
            "frame: {} focus: {} FWHM: {:.3}",
            frame.label(),
            focus,
            fwhm
        );
        Some(FocusSample {
            label: frame.label().to_owned(),
            fwhm,
            focus,
        })
    }

    /// Fit the focus curve of one group.
    ///
    /// A group where not a single frame yields a FocusSample is a reportable
    /// failure; frames failing individually are skipped with a warning.
    pub fn process_group(&self, group: &FocusGroup) -> Result<FocusResult, FocusError> {
        let mut samples: Vec<FocusSample> = group
            .frames
            .par_iter()
            .filter_map(|frame| self.measure_frame(frame))
            .collect();
        if samples.is_empty() {
            return Err(FocusError::NoUsableSamples(group.mode_name.clone()));
        }
        samples.sort_by(|a, b| a.focus.total_cmp(&b.focus));

        let curve = FocusCurve::fit(&samples);
        log::info!(
            "best focus for mode {} is {:.3}",
            group.mode_name,
            curve.best_focus()
        );

        let first_header = group.frames[0].header();
        let value = |key: &str| first_header.str_value(key).unwrap_or_default().to_owned();
        Ok(FocusResult {
            date: value("DATE"),
            time: value("DATE-OBS"),
            mode_name: group.mode_name.clone(),
            best_focus: curve.best_focus(),
            best_fwhm: curve.best_fwhm(),
            best_image: curve.best_sample().clone(),
            focus_series: samples.iter().map(|s| s.focus).collect(),
            fwhm_series: samples.iter().map(|s| s.fwhm).collect(),
            curve,
        })
    }

    /// Process every group; the first group without any usable sample aborts
    /// the run.
    pub fn run(&self, groups: &[FocusGroup]) -> Result<Vec<FocusResult>, FocusError> {
        groups.iter().map(|group| self.process_group(group)).collect()
    }
}

#[derive(Serialize)]
struct CsvRecord<'a> {
    date: &'a str,
    time: &'a str,
    mode_name: &'a str,
    best_focus: f64,
    best_fwhm: f64,
    best_image: &'a str,
    best_image_focus: f64,
    best_image_fwhm: f64,
    focus_series: String,
    fwhm_series: String,
}

/// Write one CSV row per configuration group.
pub fn to_csv(results: &[FocusResult], filename: &str) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(filename)?;
    for result in results {
        writer.serialize(CsvRecord {
            date: &result.date,
            time: &result.time,
            mode_name: &result.mode_name,
            best_focus: result.best_focus,
            best_fwhm: result.best_fwhm,
            best_image: &result.best_image.label,
            best_image_focus: result.best_image.focus,
            best_image_fwhm: result.best_image.fwhm,
            focus_series: result.focus_series.iter().join(" "),
            fwhm_series: result.fwhm_series.iter().map(|f| format!("{:.3}", f)).join(" "),
        })?;
    }
    writer.flush()?;
    Ok(())
}
