//! The contract of the external instance segmentation detector.

mod config;

pub use config::*;

use crate::{common::*, dataset::AnnotatedDataset};

/// Layers of the head branches. Heads-only training updates these and freezes the rest.
pub const HEAD_LAYERS: [&str; 4] = [
    "mrcnn_class_logits",
    "mrcnn_bbox_fc",
    "mrcnn_bbox",
    "mrcnn_mask",
];

/// Whether a detector is built for training or for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorMode {
    Training,
    Inference,
}

impl Display for DetectorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Training => "training",
            Self::Inference => "inference",
        };
        write!(f, "{}", text)
    }
}

/// The layers updated by a training phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerSelector {
    Heads,
    All,
}

impl Display for LayerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heads => write!(f, "heads"),
            Self::All => write!(f, "all"),
        }
    }
}

/// How stored weights are matched to the layers of a detector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightSelection {
    /// Match layers by name instead of by topological order.
    pub by_name: bool,
    /// Layers left uninitialized.
    pub exclude: Vec<String>,
}

impl WeightSelection {
    /// Load every stored layer.
    pub fn all() -> Self {
        Self {
            by_name: true,
            exclude: vec![],
        }
    }

    /// Load every layer except the heads, which depend on the number of classes.
    pub fn without_heads() -> Self {
        Self {
            by_name: true,
            exclude: HEAD_LAYERS.iter().map(|&name| name.to_owned()).collect(),
        }
    }
}

/// One detected instance in original image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: TLBR<usize>,
    pub class_id: i32,
    pub score: R64,
    /// Boolean mask in `(height, width)` layout covering the whole image.
    pub mask: Array2<bool>,
}

/// A trainable instance segmentation detector.
///
/// A detector is a scoped resource. It releases whatever it holds when dropped.
pub trait Detector {
    fn load_weights(&mut self, path: &Path, selection: &WeightSelection) -> Result<()>;

    /// Train the selected layers until the cumulative epoch count reaches `epoch_target`.
    fn train(
        &mut self,
        train: &AnnotatedDataset,
        val: &AnnotatedDataset,
        learning_rate: R64,
        epoch_target: usize,
        layers: &LayerSelector,
    ) -> Result<()>;

    /// The most recent checkpoint written by training.
    fn find_last_checkpoint(&self) -> Result<PathBuf>;

    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Creates fresh detector instances.
pub trait DetectorFactory {
    type Detector: Detector;

    fn create(&mut self, mode: DetectorMode, config: &DetectorConfig) -> Result<Self::Detector>;
}

impl<F> DetectorFactory for &mut F
where
    F: DetectorFactory + ?Sized,
{
    type Detector = F::Detector;

    fn create(&mut self, mode: DetectorMode, config: &DetectorConfig) -> Result<Self::Detector> {
        (**self).create(mode, config)
    }
}
