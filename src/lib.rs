//! Best-focus estimation from focus calibration sequences.
//!
//! A focus sequence is a set of exposures of the same field or lamp taken at
//! different focus positions. Each frame is reduced to a background-subtracted
//! intensity profile, spectral or spatial features are detected as peaks and
//! their widths measured by fitting a peak-shape model; the per-frame widths
//! are combined into one robust FWHM per exposure. Fitting a polynomial to
//! FWHM versus focus across the sequence then locates the focus position
//! minimizing the feature width.
//!
//! ```no_run
//! use focus_finder::{FeaturesModel, FocusSession, FrameCollector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let groups = FrameCollector::default().data_path("data").collect()?;
//! let session = FocusSession::new(FeaturesModel::Gaussian);
//! for result in session.run(&groups)? {
//!     println!("{}", result.summary());
//! }
//! # Ok(())
//! # }
//! ```

pub mod collection;
mod error;
pub mod fits;
pub mod fitting;
pub mod focus;
pub mod frame;
pub mod fwhm;
pub mod peaks;
#[cfg(feature = "plot")]
mod plot;
pub mod profile;
pub mod session;
pub mod stats;

pub use collection::{FocusGroup, FrameCollector};
pub use error::Error;
pub use focus::{FocusCurve, FocusSample};
pub use frame::Frame;
pub use fwhm::FeaturesModel;
pub use session::{FocusResult, FocusSession};
