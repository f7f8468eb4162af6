//! A detector backed by an external Python script.
//!
//! Every operation writes a JSON request file and runs
//! `<python> <script> <command> --request <file>`. The script runs a `train` or `detect`
//! command and exits. Training writes `mask_rcnn_<name>_<epoch>.h5` checkpoints into
//! sub-directories of the model directory named in the request. Detection prints a JSON
//! list of instances to stdout, each with a `[t, l, b, r]` box, a class id, a score and
//! a row-major run-length encoded mask.

use crate::common::*;
use monkey_seg::{
    AnnotatedDataset, Detection, Detector, DetectorConfig, DetectorFactory, DetectorMode,
    LayerSelector, WeightSelection,
};

/// Script detector options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDetectorConfig {
    #[serde(default = "default_python")]
    pub python: PathBuf,
    pub script: PathBuf,
    /// Keep every checkpoint. Otherwise a training detector keeps only its newest
    /// checkpoint, and an inference detector removes the checkpoints it evaluated.
    #[serde(default)]
    pub keep_checkpoints: bool,
}

fn default_python() -> PathBuf {
    #[cfg(target_os = "windows")]
    let python = "python";
    #[cfg(not(target_os = "windows"))]
    let python = "python3";
    python.into()
}

/// Creates script detectors, each with its own model and request directories.
#[derive(Debug)]
pub struct ScriptDetectorFactory {
    config: ScriptDetectorConfig,
    work_dir: PathBuf,
    num_created: usize,
}

impl ScriptDetectorFactory {
    pub fn new(config: ScriptDetectorConfig, work_dir: impl AsRef<Path>) -> Result<Self> {
        let work_dir = work_dir.as_ref().to_owned();
        fs::create_dir_all(&work_dir)?;
        Ok(Self {
            config,
            work_dir,
            num_created: 0,
        })
    }
}

impl DetectorFactory for ScriptDetectorFactory {
    type Detector = ScriptDetector;

    fn create(&mut self, mode: DetectorMode, config: &DetectorConfig) -> Result<ScriptDetector> {
        let index = self.num_created;
        self.num_created += 1;

        let model_dir = self.work_dir.join(format!("model-{:04}", index));
        let request_dir = self.work_dir.join(format!("request-{:04}", index));
        fs::create_dir_all(&model_dir)?;
        fs::create_dir_all(&request_dir)?;
        debug!("created {} detector in '{}'", mode, model_dir.display());

        Ok(ScriptDetector {
            mode,
            script: self.config.clone(),
            config: config.clone(),
            work_dir: self.work_dir.clone(),
            model_dir,
            request_dir,
            weights: None,
            num_requests: 0,
        })
    }
}

/// A detector instance driven through the script.
///
/// Weights and trained state live in files. Loaded weights are handed to the next
/// script run, and after each training run the detector continues from its newest
/// checkpoint.
#[derive(Debug)]
pub struct ScriptDetector {
    mode: DetectorMode,
    script: ScriptDetectorConfig,
    config: DetectorConfig,
    work_dir: PathBuf,
    model_dir: PathBuf,
    request_dir: PathBuf,
    weights: Option<WeightsRequest>,
    num_requests: usize,
}

impl ScriptDetector {
    fn next_request_file(&mut self, command: &str) -> PathBuf {
        let file = self
            .request_dir
            .join(format!("{}-{:04}.json", command, self.num_requests));
        self.num_requests += 1;
        file
    }

    fn run_script(
        &self,
        command: &str,
        request_file: &Path,
        request: &Request<'_>,
    ) -> Result<Vec<u8>> {
        fs::write(request_file, serde_json::to_vec(request)?)?;

        let output = Command::new(&self.script.python)
            .arg(&self.script.script)
            .arg(command)
            .arg("--request")
            .arg(request_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| {
                format!(
                    "failed to run '{} {}'",
                    self.script.python.display(),
                    self.script.script.display()
                )
            })?;

        ensure!(
            output.status.success(),
            "detector script '{}' exited with code {}",
            command,
            output.status.code().unwrap_or(-1)
        );
        Ok(output.stdout)
    }

    /// Checkpoints in the model directory, oldest first.
    fn checkpoints(&self) -> Result<Vec<PathBuf>> {
        let name = self.config.base.name.to_lowercase();
        let pattern = format!(
            "{}/{}*/mask_rcnn_{}_*.h5",
            self.model_dir.display(),
            name,
            name
        );
        let paths: Vec<PathBuf> = glob::glob(&pattern)?.try_collect()?;
        Ok(paths.into_iter().sorted().collect())
    }

    /// Remove every checkpoint except the newest one.
    fn prune_checkpoints(&self) -> Result<()> {
        let mut checkpoints = self.checkpoints()?;
        checkpoints.pop();
        for path in checkpoints {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove '{}'", path.display()))?;
        }
        Ok(())
    }

    /// Remove the own model directory and the one under the work directory holding the
    /// loaded weights.
    fn remove_model_dirs(&self) -> Result<()> {
        let weights_dir = self
            .weights
            .as_ref()
            .and_then(|weights| weights.path.strip_prefix(&self.work_dir).ok())
            .and_then(|suffix| suffix.components().next())
            .filter(|component| {
                component
                    .as_os_str()
                    .to_string_lossy()
                    .starts_with("model-")
            })
            .map(|component| self.work_dir.join(component))
            .filter(|dir| dir.is_dir());

        for dir in iter::once(self.model_dir.clone()).chain(weights_dir) {
            if dir.exists() {
                fs::remove_dir_all(&dir)
                    .with_context(|| format!("failed to remove '{}'", dir.display()))?;
                debug!("removed '{}'", dir.display());
            }
        }
        Ok(())
    }

    fn request<'a>(&'a self, payload: Payload<'a>) -> Request<'a> {
        Request {
            mode: self.mode,
            config: &self.config,
            model_dir: &self.model_dir,
            weights: self.weights.as_ref(),
            payload,
        }
    }
}

impl Detector for ScriptDetector {
    fn load_weights(&mut self, path: &Path, selection: &WeightSelection) -> Result<()> {
        ensure!(
            path.is_file(),
            "weights file '{}' does not exist",
            path.display()
        );
        self.weights = Some(WeightsRequest {
            path: path.to_owned(),
            selection: selection.clone(),
        });
        Ok(())
    }

    fn train(
        &mut self,
        train: &AnnotatedDataset,
        val: &AnnotatedDataset,
        learning_rate: R64,
        epoch_target: usize,
        layers: &LayerSelector,
    ) -> Result<()> {
        ensure!(
            self.mode == DetectorMode::Training,
            "cannot train a detector in {} mode",
            self.mode
        );

        let train = manifest(train)?;
        let val = manifest(val)?;
        let request_file = self.next_request_file("train");
        let request = self.request(Payload::Train {
            train,
            val,
            learning_rate,
            epochs: epoch_target,
            layers,
        });
        self.run_script("train", &request_file, &request)?;

        let checkpoint = self.find_last_checkpoint()?;
        debug!("continuing from checkpoint '{}'", checkpoint.display());
        self.weights = Some(WeightsRequest {
            path: checkpoint,
            selection: WeightSelection::all(),
        });
        Ok(())
    }

    fn find_last_checkpoint(&self) -> Result<PathBuf> {
        self.checkpoints()?
            .pop()
            .ok_or_else(|| format_err!("no checkpoint found in '{}'", self.model_dir.display()))
    }

    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        ensure!(
            self.mode == DetectorMode::Inference,
            "cannot run detection with a detector in {} mode",
            self.mode
        );

        let image_file = self.request_dir.join("image.png");
        image.save(&image_file)?;

        let request_file = self.next_request_file("detect");
        let request = self.request(Payload::Detect { image: &image_file });
        let stdout = self.run_script("detect", &request_file, &request)?;
        parse_detections(&stdout, image.height() as usize, image.width() as usize)
    }
}

impl Drop for ScriptDetector {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.request_dir) {
            warn!(
                "failed to remove '{}': {}",
                self.request_dir.display(),
                err
            );
        }

        if self.script.keep_checkpoints {
            return;
        }

        // the newest checkpoint stays for the inference detector
        let result = match self.mode {
            DetectorMode::Training => self.prune_checkpoints(),
            DetectorMode::Inference => self.remove_model_dirs(),
        };
        if let Err(err) = result {
            warn!("failed to clean up checkpoints: {:#}", err);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct WeightsRequest {
    path: PathBuf,
    #[serde(flatten)]
    selection: WeightSelection,
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    mode: DetectorMode,
    config: &'a DetectorConfig,
    model_dir: &'a Path,
    weights: Option<&'a WeightsRequest>,
    #[serde(flatten)]
    payload: Payload<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Payload<'a> {
    Train {
        train: Vec<ManifestEntry>,
        val: Vec<ManifestEntry>,
        learning_rate: R64,
        epochs: usize,
        layers: &'a LayerSelector,
    },
    Detect {
        image: &'a Path,
    },
}

/// An image with its rasterized instance masks.
#[derive(Debug, Serialize)]
struct ManifestEntry {
    path: PathBuf,
    height: usize,
    width: usize,
    class_ids: Vec<i32>,
    masks: Vec<Rle>,
}

fn manifest(dataset: &AnnotatedDataset) -> Result<Vec<ManifestEntry>> {
    dataset
        .image_ids()
        .map(|image_id| -> Result<_> {
            let record = dataset.record(image_id)?;
            let masks = dataset.get_mask(image_id)?;
            let rles: Vec<_> = (0..masks.num_instances())
                .map(|index| Rle::encode(masks.plane(index)))
                .collect();

            Ok(ManifestEntry {
                path: record.path.clone(),
                height: record.height,
                width: record.width,
                class_ids: masks.class_ids.to_vec(),
                masks: rles,
            })
        })
        .try_collect()
}

#[derive(Debug, Deserialize)]
struct DetectionOutput {
    bbox: [usize; 4],
    class_id: i32,
    score: R64,
    mask: Rle,
}

fn parse_detections(stdout: &[u8], height: usize, width: usize) -> Result<Vec<Detection>> {
    let outputs: Vec<DetectionOutput> = serde_json::from_slice(stdout)
        .with_context(|| "the detector script printed malformed detections")?;

    outputs
        .into_iter()
        .map(|output| -> Result<_> {
            let DetectionOutput {
                bbox,
                class_id,
                score,
                mask,
            } = output;

            let mask = mask.decode()?;
            ensure!(
                mask.dim() == (height, width),
                "detection mask has shape {:?} but the image is {}x{}",
                mask.dim(),
                height,
                width
            );

            let bbox = TLBR::try_from_tlbr(bbox)?;
            let [_, _, bottom, right] = bbox.tlbr();
            ensure!(
                bottom <= height && right <= width,
                "detection box {:?} exceeds the {}x{} image",
                bbox.tlbr(),
                height,
                width
            );

            Ok(Detection {
                bbox,
                class_id,
                score,
                mask,
            })
        })
        .try_collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use monkey_seg::{BaseModelConfig, HyperParams};

    fn detector_config() -> DetectorConfig {
        let hyper = HyperParams {
            learning_rate: r64(1e-4),
            image_dim: 128,
            detection_nms_threshold: r64(0.3),
            detection_min_confidence: r64(0.9),
        };
        DetectorConfig::new(&BaseModelConfig::default(), &hyper)
    }

    fn script_config(keep_checkpoints: bool) -> ScriptDetectorConfig {
        ScriptDetectorConfig {
            python: default_python(),
            script: "detector.py".into(),
            keep_checkpoints,
        }
    }

    /// Write empty checkpoints named like the ones the script writes.
    fn write_checkpoints(model_dir: &Path, checkpoints: &[(&str, usize)]) -> Result<()> {
        for &(sub_dir, epoch) in checkpoints {
            fs::create_dir_all(model_dir.join(sub_dir))?;
            let file = format!("mask_rcnn_monkeys_{:04}.h5", epoch);
            fs::write(model_dir.join(sub_dir).join(file), b"")?;
        }
        Ok(())
    }

    const CHECKPOINTS: [(&str, usize); 3] = [
        ("monkeys20220101T0000", 5),
        ("monkeys20220102T0930", 2),
        ("monkeys20220102T0930", 10),
    ];

    #[test]
    fn parse_detection_output() -> Result<()> {
        let stdout = br#"[
            {"bbox": [0, 1, 2, 3], "class_id": 1, "score": 0.97,
             "mask": {"size": [2, 3], "counts": [1, 2, 1, 2]}}
        ]"#;
        let detections = parse_detections(stdout, 2, 3)?;

        assert_eq!(detections.len(), 1);
        let detection = &detections[0];
        assert_eq!(detection.bbox.tlbr(), [0, 1, 2, 3]);
        assert_eq!(detection.score, r64(0.97));
        assert_eq!(
            detection.mask.iter().cloned().collect::<Vec<_>>(),
            vec![false, true, true, false, true, true]
        );

        assert!(parse_detections(b"[]", 2, 3)?.is_empty());
        assert!(parse_detections(stdout, 3, 2).is_err());
        assert!(parse_detections(b"not json", 2, 3).is_err());

        let outside = br#"[
            {"bbox": [0, 1, 3, 3], "class_id": 1, "score": 0.97,
             "mask": {"size": [2, 3], "counts": [1, 2, 1, 2]}}
        ]"#;
        assert!(parse_detections(outside, 2, 3).is_err());
        Ok(())
    }

    #[test]
    fn last_checkpoint_is_the_newest() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut factory = ScriptDetectorFactory::new(script_config(false), dir.path())?;
        let detector = factory.create(DetectorMode::Training, &detector_config())?;
        assert!(detector.find_last_checkpoint().is_err());

        let model_dir = dir.path().join("model-0000");
        write_checkpoints(&model_dir, &CHECKPOINTS)?;

        assert_eq!(
            detector.find_last_checkpoint()?,
            model_dir.join("monkeys20220102T0930/mask_rcnn_monkeys_0010.h5")
        );

        // the request directory goes away with the detector
        let request_dir = dir.path().join("request-0000");
        assert!(request_dir.is_dir());
        drop(detector);
        assert!(!request_dir.exists());
        Ok(())
    }

    #[test]
    fn detectors_check_their_mode() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut factory = ScriptDetectorFactory::new(script_config(false), dir.path())?;

        let mut detector = factory.create(DetectorMode::Training, &detector_config())?;
        let image = DynamicImage::new_rgb8(4, 4);
        assert!(detector.detect(&image).is_err());
        assert!(detector
            .load_weights(&dir.path().join("missing.h5"), &WeightSelection::all())
            .is_err());
        Ok(())
    }

    #[test]
    fn request_layout() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut factory = ScriptDetectorFactory::new(script_config(false), dir.path())?;
        let mut detector = factory.create(DetectorMode::Inference, &detector_config())?;

        let weights = dir.path().join("coco.h5");
        fs::write(&weights, b"")?;
        detector.load_weights(&weights, &WeightSelection::without_heads())?;

        let image = PathBuf::from("image.png");
        let request = detector.request(Payload::Detect { image: &image });
        let value = serde_json::to_value(&request)?;

        assert_eq!(value["mode"], "inference");
        assert_eq!(value["image"], "image.png");
        assert_eq!(value["config"]["image_max_dim"], 128);
        assert_eq!(value["weights"]["by_name"], true);
        assert_eq!(value["weights"]["exclude"].as_array().unwrap().len(), 4);
        Ok(())
    }

    #[test]
    fn training_detector_keeps_the_newest_checkpoint() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut factory = ScriptDetectorFactory::new(script_config(false), dir.path())?;
        let detector = factory.create(DetectorMode::Training, &detector_config())?;

        let model_dir = dir.path().join("model-0000");
        write_checkpoints(&model_dir, &CHECKPOINTS)?;
        drop(detector);

        let remaining: Vec<PathBuf> =
            glob::glob(&format!("{}/*/*.h5", model_dir.display()))?.try_collect()?;
        assert_eq!(
            remaining,
            vec![model_dir.join("monkeys20220102T0930/mask_rcnn_monkeys_0010.h5")]
        );
        Ok(())
    }

    #[test]
    fn inference_detector_removes_evaluated_checkpoints() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let pretrained = dir.path().join("coco.h5");
        fs::write(&pretrained, b"")?;

        let mut factory = ScriptDetectorFactory::new(script_config(false), dir.path())?;
        let trainer = factory.create(DetectorMode::Training, &detector_config())?;
        write_checkpoints(&dir.path().join("model-0000"), &CHECKPOINTS)?;
        let checkpoint = trainer.find_last_checkpoint()?;
        drop(trainer);

        let mut detector = factory.create(DetectorMode::Inference, &detector_config())?;
        detector.load_weights(&checkpoint, &WeightSelection::all())?;
        drop(detector);

        assert!(!dir.path().join("model-0000").exists());
        assert!(!dir.path().join("model-0001").exists());
        assert!(pretrained.is_file());
        Ok(())
    }

    #[test]
    fn checkpoints_are_kept_on_request() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut factory = ScriptDetectorFactory::new(script_config(true), dir.path())?;
        let trainer = factory.create(DetectorMode::Training, &detector_config())?;
        let model_dir = dir.path().join("model-0000");
        write_checkpoints(&model_dir, &CHECKPOINTS)?;
        let checkpoint = trainer.find_last_checkpoint()?;
        drop(trainer);

        let mut detector = factory.create(DetectorMode::Inference, &detector_config())?;
        detector.load_weights(&checkpoint, &WeightSelection::all())?;
        drop(detector);

        let remaining: Vec<PathBuf> =
            glob::glob(&format!("{}/*/*.h5", model_dir.display()))?.try_collect()?;
        assert_eq!(remaining.len(), 3);
        assert!(dir.path().join("model-0001").is_dir());
        Ok(())
    }
}
