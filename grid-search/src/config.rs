//! Search program configuration format.

use crate::{common::*, script::ScriptDetectorConfig};
use monkey_seg::{DatasetLayout, SearchOptions};

/// The main search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetLayout,
    pub search: SearchOptions,
    pub detector: ScriptDetectorConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

/// Output options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Each run writes into a timestamped directory under this one.
    pub dir: PathBuf,
}
