//! Synthetic focus-sequence generator.
//!
//! Writes a sequence of FITS frames with focus positions linearly spaced
//! across a span and a single Gaussian feature whose width follows a
//! quadratic in focus, for demos and end-to-end checks of the focus finder.

use std::fs;
use std::path::PathBuf;

use rand::prelude::*;
use structopt::StructOpt;

use focus_finder::fits::{self, Header};
use focus_finder::fitting::polyval;
use focus_finder::fwhm::SIGMA_TO_FWHM;

#[derive(Debug, StructOpt)]
#[structopt(name = "focus-sim", about = "Generate a synthetic focus calibration sequence")]
struct Opt {
    /// Directory the frames are written to
    #[structopt(long, default_value = "focus-sequence")]
    output: PathBuf,
    /// Number of frames in the sequence
    #[structopt(long, default_value = "21")]
    frames: usize,
    /// Lowest focus position
    #[structopt(long, default_value = "-2000")]
    focus_min: f64,
    /// Highest focus position
    #[structopt(long, default_value = "2000")]
    focus_max: f64,
    /// Feature amplitude in ADU
    #[structopt(long, default_value = "600")]
    amplitude: f64,
    /// Uniform background level in ADU
    #[structopt(long, default_value = "100")]
    background: f64,
    /// Peak-to-peak uniform noise in ADU
    #[structopt(long, default_value = "0")]
    noise: f64,
    /// Random seed
    #[structopt(long, default_value = "0")]
    seed: u64,
}

const ROWS: usize = 100;
const COLS: usize = 1000;

/// FWHM versus focus: minimum width near focus zero.
const WIDTH_COEFFICIENTS: [f64; 3] = [5.0, 1e-6, 1e-6];

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    fs::create_dir_all(&opt.output)?;
    let mut rng = StdRng::seed_from_u64(opt.seed);

    for i in 0..opt.frames {
        let focus = if opt.frames > 1 {
            opt.focus_min
                + (opt.focus_max - opt.focus_min) * i as f64 / (opt.frames - 1) as f64
        } else {
            opt.focus_min
        };
        let fwhm = polyval(&WIDTH_COEFFICIENTS, focus);
        let stddev = fwhm / SIGMA_TO_FWHM;

        let center = COLS as f64 / 2.0;
        let row: Vec<f64> = (0..COLS)
            .map(|x| {
                let d = x as f64 - center;
                opt.background + opt.amplitude * (-d * d / (2.0 * stddev * stddev)).exp()
            })
            .collect();
        let mut data = Vec::with_capacity(ROWS * COLS);
        for _ in 0..ROWS {
            data.extend(row.iter().map(|&v| {
                if opt.noise > 0.0 {
                    v + rng.gen_range(-opt.noise / 2.0..opt.noise / 2.0)
                } else {
                    v
                }
            }));
        }

        let mut header = Header::new();
        header.set("DATE", "2019-09-26");
        header.set("DATE-OBS", "2019-09-26T07:32:15.102");
        header.set("INSTCONF", "Red");
        header.set("OBSTYPE", "FOCUS");
        header.set("CAM_FOC", focus);
        header.set("CAM_TARG", 0i64);
        header.set("GRT_TARG", 0i64);
        header.set("FILTER", "filter");
        header.set("FILTER2", "filter2");
        header.set("GRATING", "grating");
        header.set("SLIT", "0.4 slit");
        header.set("WAVMODE", "400m2");
        header.set("EXPTIME", 10.0);
        header.set("RDNOISE", 1i64);
        header.set("GAIN", 1i64);
        header.set("ROI", "user-defined");

        let filename = opt.output.join(format!("file_{}.fits", i + 1));
        fits::write_primary(&filename, &header, ROWS, COLS, &data)?;
        log::info!(
            "wrote {} focus: {:.1} FWHM: {:.3}",
            filename.display(),
            focus,
            fwhm
        );
    }
    Ok(())
}
