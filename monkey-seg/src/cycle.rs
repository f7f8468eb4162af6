//! Two-phase training of one fold followed by mask mAP evaluation.

use crate::{
    common::*,
    dataset::AnnotatedDataset,
    detector::{
        BaseModelConfig, Detector, DetectorConfig, DetectorFactory, DetectorMode, LayerSelector,
        WeightSelection,
    },
    eval::{
        image_average_precision, ApCalculator, ApScore, IntegralMethod, SquareResize, Undefined,
    },
    params::HyperParams,
};

/// The fine-tuning phase trains at the learning rate divided by this value.
pub const FINE_TUNE_LR_DIVISOR: f64 = 10.0;

/// Settings of a training and evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOptions {
    /// Epochs of heads-only training.
    pub head_epochs: usize,
    /// Epochs of all-layer training after the head phase.
    pub fine_tune_epochs: usize,
    #[serde(default = "default_fine_tune_lr_divisor")]
    pub fine_tune_lr_divisor: R64,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: R64,
    #[serde(default)]
    pub integral_method: IntegralMethod,
    /// Weights the training detector starts from. The heads are left uninitialized.
    pub pretrained_weights: Option<PathBuf>,
    #[serde(default)]
    pub base: BaseModelConfig,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            head_epochs: 5,
            fine_tune_epochs: 5,
            fine_tune_lr_divisor: default_fine_tune_lr_divisor(),
            iou_threshold: default_iou_threshold(),
            integral_method: IntegralMethod::default(),
            pretrained_weights: None,
            base: BaseModelConfig::default(),
        }
    }
}

fn default_fine_tune_lr_divisor() -> R64 {
    r64(FINE_TUNE_LR_DIVISOR)
}

fn default_iou_threshold() -> R64 {
    r64(crate::eval::DEFAULT_IOU_THRESHOLD)
}

/// Trains a fresh detector on one fold and measures its mAP on the fold's test set.
#[derive(Debug, Clone)]
pub struct TrainEvalCycle {
    options: CycleOptions,
    calculator: ApCalculator,
}

impl TrainEvalCycle {
    pub fn new(options: CycleOptions) -> Result<Self> {
        ensure!(
            options.fine_tune_lr_divisor > 0.0,
            "fine_tune_lr_divisor must be positive, but got {}",
            options.fine_tune_lr_divisor
        );
        ensure!(
            options.iou_threshold > 0.0 && options.iou_threshold <= 1.0,
            "iou_threshold must be in (0, 1], but got {}",
            options.iou_threshold
        );
        let calculator = ApCalculator::new(options.integral_method)?;

        Ok(Self {
            options,
            calculator,
        })
    }

    pub fn options(&self) -> &CycleOptions {
        &self.options
    }

    /// Run the cycle.
    ///
    /// The heads are trained for `head_epochs` epochs at the configured learning rate,
    /// then all layers until epoch `head_epochs + fine_tune_epochs` at the learning rate
    /// divided by the fine-tune divisor. A new inference detector loads the last
    /// checkpoint and the mean image AP over the test set is returned.
    ///
    /// An empty test set yields an undefined score without training. Detector failures
    /// are returned as errors.
    pub fn run<F>(
        &self,
        factory: &mut F,
        train: &AnnotatedDataset,
        val: &AnnotatedDataset,
        test: &AnnotatedDataset,
        hyper: &HyperParams,
    ) -> Result<ApScore>
    where
        F: DetectorFactory,
    {
        if test.is_empty() {
            warn!("the test set is empty, the fold mAP is undefined");
            return Ok(ApScore::Undefined(Undefined::EmptyTestSet));
        }

        let config = DetectorConfig::new(&self.options.base, hyper);
        let checkpoint = self.train(factory, &config, train, val)?;
        self.evaluate(factory, &config, &checkpoint, test)
    }

    fn train<F>(
        &self,
        factory: &mut F,
        config: &DetectorConfig,
        train: &AnnotatedDataset,
        val: &AnnotatedDataset,
    ) -> Result<PathBuf>
    where
        F: DetectorFactory,
    {
        let CycleOptions {
            head_epochs,
            fine_tune_epochs,
            fine_tune_lr_divisor,
            ref pretrained_weights,
            ..
        } = self.options;

        let mut detector = factory.create(DetectorMode::Training, config)?;

        if let Some(path) = pretrained_weights {
            info!("loading pretrained weights from '{}'", path.display());
            detector.load_weights(path, &WeightSelection::without_heads())?;
        }

        info!(
            "training head layers for {} epochs, {} train and {} val images",
            head_epochs,
            train.len(),
            val.len()
        );
        detector.train(
            train,
            val,
            config.learning_rate,
            head_epochs,
            &LayerSelector::Heads,
        )?;

        info!("fine tuning all layers for {} epochs", fine_tune_epochs);
        detector.train(
            train,
            val,
            config.learning_rate / fine_tune_lr_divisor,
            head_epochs + fine_tune_epochs,
            &LayerSelector::All,
        )?;

        detector.find_last_checkpoint()
    }

    fn evaluate<F>(
        &self,
        factory: &mut F,
        config: &DetectorConfig,
        checkpoint: &Path,
        test: &AnnotatedDataset,
    ) -> Result<ApScore>
    where
        F: DetectorFactory,
    {
        info!("evaluating checkpoint '{}'", checkpoint.display());

        let mut detector = factory.create(DetectorMode::Inference, config)?;
        detector.load_weights(checkpoint, &WeightSelection::all())?;

        let iou_threshold = self.options.iou_threshold;
        let scores: Vec<_> = test
            .image_ids()
            .map(|image_id| -> Result<_> {
                let path = test.get_reference(image_id)?;
                let image = image::open(path)
                    .with_context(|| format!("failed to decode image '{}'", path.display()))?;
                let resize = SquareResize::new(
                    image.height() as usize,
                    image.width() as usize,
                    config.image_max_dim,
                )?;
                let detections = detector.detect(&resize.image(&image))?;
                let ground_truth = resize.masks(&test.get_mask(image_id)?)?;

                let score = image_average_precision(
                    &self.calculator,
                    &detections,
                    &ground_truth,
                    iou_threshold,
                )?;
                debug!(
                    "{} detections on '{}', AP {}",
                    detections.len(),
                    path.display(),
                    score
                );
                Ok(score)
            })
            .try_collect()?;

        let mean_ap = ApScore::mean(scores);
        info!("test mAP {}", mean_ap);
        Ok(mean_ap)
    }
}
