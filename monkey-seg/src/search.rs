//! Exhaustive hyperparameter search scored by k-fold cross-validated mAP.

use crate::{
    common::*,
    cycle::{CycleOptions, TrainEvalCycle},
    dataset::{AnnotatedDataset, ClassMapping, DatasetLayout, ViaAnnotations},
    detector::DetectorFactory,
    eval::{ApScore, Undefined},
    params::{HyperParams, SearchSpace},
    split::{nested_validation_split, Fold, FoldSplitter, DEFAULT_VAL_FRACTION},
};

/// Search procedure options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default)]
    pub space: SearchSpace,
    pub num_folds: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fraction of the image universe reserved before the search starts.
    #[serde(default = "default_holdout_fraction")]
    pub holdout_fraction: R64,
    /// Fraction of each fold's training portion used for validation.
    #[serde(default = "default_val_fraction")]
    pub val_fraction: R64,
    #[serde(default)]
    pub cycle: CycleOptions,
    #[serde(default)]
    pub classes: ClassMapping,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            space: SearchSpace::default(),
            num_folds: 3,
            seed: default_seed(),
            holdout_fraction: default_holdout_fraction(),
            val_fraction: default_val_fraction(),
            cycle: CycleOptions::default(),
            classes: ClassMapping::default(),
        }
    }
}

fn default_seed() -> u64 {
    123
}

fn default_holdout_fraction() -> R64 {
    r64(0.2)
}

fn default_val_fraction() -> R64 {
    r64(DEFAULT_VAL_FRACTION)
}

/// The cross-validated score of one hyperparameter configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub hyper: HyperParams,
    pub mean_ap: ApScore,
}

impl SearchResult {
    /// The result with the highest defined mAP. Ties go to the earliest one.
    pub fn best(results: &[SearchResult]) -> Option<&SearchResult> {
        results
            .iter()
            .filter_map(|result| Some((result.mean_ap.value()?, result)))
            .rev()
            .max_by_key(|&(value, _)| value)
            .map(|(_, result)| result)
    }
}

/// Runs the k-fold evaluation for every cell of the hyperparameter grid.
#[derive(Debug)]
pub struct GridSearch {
    layout: DatasetLayout,
    annotations: ViaAnnotations,
    class_assigner: Arc<dyn ClassAssigner>,
    options: SearchOptions,
    cycle: TrainEvalCycle,
}

impl GridSearch {
    /// Prepare a search on the dataset. The annotation file is parsed once here.
    pub fn new(layout: DatasetLayout, options: SearchOptions) -> Result<Self> {
        let annotations = ViaAnnotations::open(layout.annotation_path())?;
        Self::from_annotations(layout, annotations, options)
    }

    pub fn from_annotations(
        layout: DatasetLayout,
        annotations: ViaAnnotations,
        options: SearchOptions,
    ) -> Result<Self> {
        FoldSplitter::new(options.num_folds, options.seed)?;
        ensure!(
            options.val_fraction > 0.0 && options.val_fraction < 1.0,
            "val_fraction must be in (0, 1), but got {}",
            options.val_fraction
        );
        options.classes.check(options.cycle.base.num_classes)?;
        let cycle = TrainEvalCycle::new(options.cycle.clone())?;

        Ok(Self {
            layout,
            annotations,
            class_assigner: options.classes.assigner(),
            options,
            cycle,
        })
    }

    /// Evaluate every configuration on the image universe, in enumeration order.
    ///
    /// A configuration whose training or inference fails on some fold is recorded with
    /// an undefined score and the search moves on. Dataset and split failures abort the
    /// search.
    pub fn run<F>(&self, factory: &mut F, universe: &[String]) -> Result<Vec<SearchResult>>
    where
        F: DetectorFactory,
    {
        let SearchOptions {
            num_folds, seed, ..
        } = self.options;
        let folds = FoldSplitter::new(num_folds, seed)?
            .split(universe.len())
            .with_context(|| format!("cannot split {} images into folds", universe.len()))?;

        let configs = self.options.space.configurations();
        let num_configs = configs.len();

        let results: Vec<_> = configs
            .into_iter()
            .enumerate()
            .map(|(index, hyper)| -> Result<_> {
                info!(
                    "evaluating variation {}/{}: {}",
                    index + 1,
                    num_configs,
                    hyper
                );
                let mean_ap = self.evaluate_configuration(factory, universe, &folds, &hyper)?;
                info!("variation {}/{} mAP {}", index + 1, num_configs, mean_ap);

                Ok(SearchResult { hyper, mean_ap })
            })
            .try_collect()?;

        Ok(results)
    }

    fn evaluate_configuration<F>(
        &self,
        factory: &mut F,
        universe: &[String],
        folds: &[Fold],
        hyper: &HyperParams,
    ) -> Result<ApScore>
    where
        F: DetectorFactory,
    {
        let num_folds = folds.len();
        let mut scores = vec![];

        for (fold_index, fold) in folds.iter().enumerate() {
            info!("fold {}/{}", fold_index + 1, num_folds);

            let (fold_train, fold_test) = fold.select(universe);
            let (train_sub, val_sub) = nested_validation_split(
                &fold_train,
                self.options.val_fraction.raw(),
                self.options.seed,
            )?;

            let train = self.dataset(&train_sub)?;
            let val = self.dataset(&val_sub)?;
            let test = self.dataset(&fold_test)?;

            let score = match self.cycle.run(factory, &train, &val, &test, hyper) {
                Ok(score) => score,
                Err(err) => {
                    warn!(
                        "fold {}/{} failed, the variation is undefined: {:#}",
                        fold_index + 1,
                        num_folds,
                        err
                    );
                    return Ok(ApScore::Undefined(Undefined::Failed(format!("{:#}", err))));
                }
            };
            info!("fold {}/{} mAP {}", fold_index + 1, num_folds, score);

            if let ApScore::Undefined(reason) = score {
                return Ok(ApScore::Undefined(reason));
            }
            scores.push(score);
        }

        Ok(ApScore::mean(scores))
    }

    fn dataset(&self, filenames: &[String]) -> Result<AnnotatedDataset> {
        AnnotatedDataset::from_annotations(
            &self.layout,
            &self.annotations,
            filenames,
            self.class_assigner.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(value: Option<f64>) -> SearchResult {
        SearchResult {
            hyper: HyperParams {
                learning_rate: r64(1e-4),
                image_dim: 128,
                detection_nms_threshold: r64(0.3),
                detection_min_confidence: r64(0.9),
            },
            mean_ap: match value {
                Some(value) => ApScore::Defined(r64(value)),
                None => ApScore::Undefined(Undefined::EmptyTestSet),
            },
        }
    }

    #[test]
    fn best_result_skips_undefined() {
        let results = vec![
            result(Some(0.2)),
            result(None),
            result(Some(0.7)),
            result(Some(0.7)),
        ];
        let best = SearchResult::best(&results).unwrap();
        assert!(std::ptr::eq(best, &results[2]));

        assert!(SearchResult::best(&[result(None)]).is_none());
    }

    #[test]
    fn search_options_defaults() -> Result<()> {
        let options: SearchOptions = serde_json::from_str(r#"{"num_folds": 4}"#)?;
        assert_eq!(options.num_folds, 4);
        assert_eq!(options.seed, 123);
        assert_eq!(options.val_fraction, r64(0.1));
        assert_eq!(options.holdout_fraction, r64(0.2));
        assert_eq!(options.cycle, CycleOptions::default());
        assert_eq!(options.classes, ClassMapping::default());
        assert_eq!(options.space.num_configurations(), 48);
        Ok(())
    }

    #[test]
    fn search_result_to_json() -> Result<()> {
        let value = serde_json::to_value(&result(None))?;
        assert_eq!(value["image_dim"], 128);
        assert!(value["mean_ap"].is_null());
        Ok(())
    }
}
