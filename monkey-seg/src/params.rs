//! Hyperparameters and the grid they are searched on.

use crate::common::*;

/// One cell of the hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HyperParams {
    pub learning_rate: R64,
    /// Images are resized so that both sides equal this size.
    pub image_dim: usize,
    pub detection_nms_threshold: R64,
    pub detection_min_confidence: R64,
}

impl Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lr={} image_dim={} nms={} min_conf={}",
            self.learning_rate,
            self.image_dim,
            self.detection_nms_threshold,
            self.detection_min_confidence
        )
    }
}

/// The value sets of each hyperparameter axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub learning_rates: Vec<R64>,
    pub image_dims: Vec<usize>,
    pub detection_nms_thresholds: Vec<R64>,
    pub detection_min_confidences: Vec<R64>,
}

impl SearchSpace {
    pub fn num_configurations(&self) -> usize {
        self.learning_rates.len()
            * self.image_dims.len()
            * self.detection_nms_thresholds.len()
            * self.detection_min_confidences.len()
    }

    /// Enumerate the Cartesian product of all axes.
    ///
    /// The learning rate axis varies slowest and the minimum confidence axis fastest.
    pub fn configurations(&self) -> Vec<HyperParams> {
        iproduct!(
            self.learning_rates.iter().cloned(),
            self.image_dims.iter().cloned(),
            self.detection_nms_thresholds.iter().cloned(),
            self.detection_min_confidences.iter().cloned()
        )
        .map(
            |(learning_rate, image_dim, detection_nms_threshold, detection_min_confidence)| {
                HyperParams {
                    learning_rate,
                    image_dim,
                    detection_nms_threshold,
                    detection_min_confidence,
                }
            },
        )
        .collect()
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            learning_rates: vec![r64(1e-4)],
            image_dims: vec![128, 256, 512, 1024],
            detection_nms_thresholds: vec![r64(0.2), r64(0.3), r64(0.4)],
            detection_min_confidences: vec![r64(0.7), r64(0.8), r64(0.9), r64(0.95)],
        }
    }
}
