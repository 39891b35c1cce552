//! A single calibration exposure.

use std::path::Path;

use crate::fits::{self, FitsError, Header};

/// Focus position header keyword used for the focus curve.
pub const FOCUS_KEYWORD: &str = "CAM_FOC";

/// A 2-D image together with its header and an identifying label.
///
/// Immutable once read; the pipeline only ever borrows it.
#[derive(Debug, Clone)]
pub struct Frame {
    label: String,
    header: Header,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Frame {
    /// Build a frame from raw row-major samples. Mostly useful for synthetic
    /// data; real frames come from [`Frame::read`].
    pub fn new<S: Into<String>>(label: S, data: Vec<f64>, rows: usize, cols: usize) -> Self {
        assert_eq!(data.len(), rows * cols);
        Self {
            label: label.into(),
            header: Header::new(),
            rows,
            cols,
            data,
        }
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.header = header;
        self
    }

    /// Read the primary HDU of a FITS file; the label is the file name.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, FitsError> {
        let path = path.as_ref();
        let hdu = fits::read_primary(path)?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            label,
            header: hdu.header,
            rows: hdu.rows,
            cols: hdu.cols,
            data: hdu.data,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn header(&self) -> &Header {
        &self.header
    }
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Focus position of this exposure, from the `CAM_FOC` card.
    pub fn focus(&self) -> Option<f64> {
        self.header.f64_value(FOCUS_KEYWORD)
    }
}
