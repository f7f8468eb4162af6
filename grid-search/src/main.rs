use anyhow::{Context, Result};
use grid_search::config::Config;
use log::LevelFilter;
use std::{env, path::PathBuf};
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Search detector hyperparameters with k-fold cross-validation
struct Args {
    #[structopt(long, default_value = "grid-search.json5")]
    /// configuration file
    pub config_file: PathBuf,
}

pub fn main() -> Result<()> {
    // log at info level unless RUST_LOG says otherwise
    let mut builder = pretty_env_logger::formatted_builder();
    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(LevelFilter::Info),
    };
    builder.init();

    let Args { config_file } = Args::from_args();
    let config = Config::open(&config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;

    grid_search::start(&config)?;

    Ok(())
}
