//! Files written into the run directory.

use crate::common::*;
use monkey_seg::SearchResult;

pub const CONFIG_FILE: &str = "config.json5";
pub const RESERVED_FILE: &str = "reserved.txt";
pub const RESULTS_CSV_FILE: &str = "results.csv";
pub const RESULTS_JSON_FILE: &str = "results.json";

/// A row of the results table. Undefined scores are written as NaN.
#[derive(Debug, Clone, Serialize)]
struct ResultRow {
    learning_rate: f64,
    image_dim: usize,
    detection_nms_threshold: f64,
    detection_min_confidence: f64,
    mean_ap: f64,
}

impl From<&SearchResult> for ResultRow {
    fn from(result: &SearchResult) -> Self {
        let hyper = &result.hyper;
        Self {
            learning_rate: hyper.learning_rate.raw(),
            image_dim: hyper.image_dim,
            detection_nms_threshold: hyper.detection_nms_threshold.raw(),
            detection_min_confidence: hyper.detection_min_confidence.raw(),
            mean_ap: result.mean_ap.to_f64(),
        }
    }
}

pub fn save_config<T>(run_dir: &Path, config: &T) -> Result<()>
where
    T: Serialize,
{
    let path = run_dir.join(CONFIG_FILE);
    let text = serde_json::to_string_pretty(config)?;
    fs::write(&path, text)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}

/// Write the names of the images kept out of the search, one per line.
pub fn save_reserved(run_dir: &Path, reserved: &[String]) -> Result<()> {
    let path = run_dir.join(RESERVED_FILE);
    let text: String = reserved.iter().map(|name| format!("{}\n", name)).collect();
    fs::write(&path, text)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}

/// Write the search results in enumeration order, as CSV and as JSON.
pub fn save_results(run_dir: &Path, results: &[SearchResult]) -> Result<()> {
    let csv_path = run_dir.join(RESULTS_CSV_FILE);
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("failed to create '{}'", csv_path.display()))?;
    results
        .iter()
        .map(ResultRow::from)
        .try_for_each(|row| writer.serialize(row))?;
    writer.flush()?;

    let json_path = run_dir.join(RESULTS_JSON_FILE);
    let text = serde_json::to_string_pretty(results)?;
    fs::write(&json_path, text)
        .with_context(|| format!("failed to write '{}'", json_path.display()))?;

    Ok(())
}
