use crate::{common::*, dataset::MONKEY_CLASS_NAME, params::HyperParams};

/// Detector settings shared by every hyperparameter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseModelConfig {
    pub name: String,
    pub gpu_count: usize,
    pub images_per_gpu: usize,
    /// Number of classes including the background.
    pub num_classes: usize,
    pub detection_max_instances: usize,
    pub train_rois_per_image: usize,
    /// Anchor side lengths in pixels.
    pub rpn_anchor_scales: Vec<usize>,
}

impl Default for BaseModelConfig {
    fn default() -> Self {
        Self {
            name: format!("{}s", MONKEY_CLASS_NAME),
            gpu_count: 1,
            images_per_gpu: 1,
            num_classes: 2,
            detection_max_instances: 1,
            train_rois_per_image: 32,
            rpn_anchor_scales: vec![8, 16, 32, 64, 128],
        }
    }
}

/// The complete settings a detector is built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(flatten)]
    pub base: BaseModelConfig,
    /// Images per training step over all GPUs.
    pub batch_size: usize,
    pub learning_rate: R64,
    pub image_min_dim: usize,
    pub image_max_dim: usize,
    pub detection_nms_threshold: R64,
    pub detection_min_confidence: R64,
}

impl DetectorConfig {
    /// Combine the base settings with a hyperparameter configuration.
    ///
    /// Images are resized to squares, so both the minimum and maximum image dimensions
    /// equal the image dimension.
    pub fn new(base: &BaseModelConfig, hyper: &HyperParams) -> Self {
        let HyperParams {
            learning_rate,
            image_dim,
            detection_nms_threshold,
            detection_min_confidence,
        } = *hyper;

        Self {
            base: base.clone(),
            batch_size: base.gpu_count * base.images_per_gpu,
            learning_rate,
            image_min_dim: image_dim,
            image_max_dim: image_dim,
            detection_nms_threshold,
            detection_min_confidence,
        }
    }
}
