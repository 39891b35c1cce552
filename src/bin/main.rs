use focus_finder::{session, FeaturesModel, FocusSession, FrameCollector};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "focus-finder",
    about = "Get the best focus value from a sequence of images taken at different focus positions"
)]
struct Opt {
    /// Folder where the data is located
    #[structopt(long, default_value = ".")]
    data_path: String,
    /// Pattern for filtering files
    #[structopt(long, default_value = "*.fits")]
    file_pattern: String,
    /// Only the files whose OBSTYPE matches this value are used
    #[structopt(long, default_value = "FOCUS")]
    obstype: String,
    /// Model fitted to the features to obtain their FWHM: gaussian or moffat
    #[structopt(long, default_value = "gaussian")]
    features_model: FeaturesModel,
    /// Save the per-group results to a CSV file
    #[structopt(long)]
    csv: Option<String>,
    /// Plot the focus curve of each group when the calculation finishes
    #[cfg(feature = "plot")]
    #[structopt(long)]
    plot_results: bool,
    /// Activate debug mode
    #[structopt(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if opt.debug { "debug" } else { "info" }),
    )
    .init();

    let groups = FrameCollector::default()
        .data_path(&opt.data_path)
        .file_pattern(&opt.file_pattern)
        .obstype(&opt.obstype)
        .collect()?;
    log::info!("found {} configuration group(s)", groups.len());

    let session = FocusSession::new(opt.features_model);
    let results = session.run(&groups)?;

    log::info!("Summary");
    for result in &results {
        log::info!("{}", result.summary());
    }
    if let Some(filename) = opt.csv {
        session::to_csv(&results, &filename)?;
    }
    #[cfg(feature = "plot")]
    if opt.plot_results {
        for result in &results {
            result.plot();
        }
    }
    Ok(())
}
