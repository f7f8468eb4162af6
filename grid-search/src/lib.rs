//! The hyperparameter search program for the monkey segmentation detector.

pub mod common;
pub mod config;
pub mod output;
pub mod script;

use crate::{common::*, config::Config, script::ScriptDetectorFactory};
use monkey_seg::{holdout_split, GridSearch, SearchResult};

pub const FILE_STRFTIME: &str = "%Y-%m-%d-%H-%M-%S.%3f%z";

/// The entry of the search program.
pub fn start(config: &Config) -> Result<()> {
    let start_time = Local::now();
    let run_dir = config
        .logging
        .dir
        .join(format!("{}", start_time.format(FILE_STRFTIME)));

    // create dirs and save config
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create '{}'", run_dir.display()))?;
    output::save_config(&run_dir, config)?;
    info!("writing outputs to '{}'", run_dir.display());

    // reserve a part of the images that the search never sees
    let images = config.dataset.list_image_files()?;
    ensure!(
        !images.is_empty(),
        "no image found in '{}'",
        config.dataset.dir.join(&config.dataset.image_dir).display()
    );
    let (universe, reserved) = holdout_split(
        &images,
        config.search.holdout_fraction.raw(),
        config.search.seed,
    )?;
    output::save_reserved(&run_dir, &reserved)?;
    info!(
        "{} images, {} reserved, {} used for the search",
        images.len(),
        reserved.len(),
        universe.len()
    );

    let search = GridSearch::new(config.dataset.clone(), config.search.clone())?;
    let mut factory =
        ScriptDetectorFactory::new(config.detector.clone(), run_dir.join("detector"))?;
    let results = search.run(&mut factory, &universe)?;
    output::save_results(&run_dir, &results)?;

    match SearchResult::best(&results) {
        Some(best) => info!("best variation {} with mAP {}", best.hyper, best.mean_ap),
        None => warn!("no variation has a defined mAP"),
    }

    Ok(())
}
