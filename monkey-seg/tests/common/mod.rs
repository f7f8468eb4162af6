#![allow(dead_code)]

use anyhow::{bail, Result};
use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use label::{mask_bbox, Polygon};
use monkey_seg::{
    AnnotatedDataset, DatasetLayout, Detection, Detector, DetectorConfig, DetectorFactory,
    DetectorMode, LayerSelector, WeightSelection,
};
use ndarray::Array2;
use noisy_float::prelude::*;
use serde_json::json;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tempfile::TempDir;

pub const IMAGE_SIZE: usize = 16;

/// A dataset directory in a scratch location.
pub struct Fixture {
    pub dir: TempDir,
    pub layout: DatasetLayout,
    pub universe: Vec<String>,
}

/// Write images with square regions `(left, top, size)` and their annotation file.
///
/// Region pixels are white and the rest is black, so a detector can find the regions
/// by thresholding.
pub fn write_dataset(entries: &[(&str, Vec<(i64, i64, i64)>)]) -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let layout = DatasetLayout::new(dir.path());
    fs::create_dir(dir.path().join(&layout.image_dir))?;

    let mut annotations = serde_json::Map::new();

    for (filename, squares) in entries {
        let mut plane = Array2::from_elem((IMAGE_SIZE, IMAGE_SIZE), false);
        let regions: Vec<_> = squares
            .iter()
            .map(|&(l, t, size)| {
                let xs = vec![l, l, l + size, l + size];
                let ys = vec![t, t + size, t + size, t];
                Polygon::new(xs.clone(), ys.clone())
                    .unwrap()
                    .rasterize_into(plane.view_mut());
                json!({
                    "shape_attributes": {
                        "name": "polygon",
                        "all_points_x": xs,
                        "all_points_y": ys,
                    },
                    "region_attributes": {},
                })
            })
            .collect();

        let image = GrayImage::from_fn(IMAGE_SIZE as u32, IMAGE_SIZE as u32, |x, y| {
            if plane[[y as usize, x as usize]] {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        image.save(layout.image_path(filename))?;

        annotations.insert(
            format!("{}{}", filename, squares.len()),
            json!({ "filename": filename, "size": 0, "regions": regions }),
        );
    }

    fs::write(
        layout.annotation_path(),
        serde_json::to_string_pretty(&annotations)?,
    )?;

    let universe = layout.list_image_files()?;
    Ok(Fixture {
        dir,
        layout,
        universe,
    })
}

/// Something the mock detectors did.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Create {
        mode: DetectorMode,
        image_dim: usize,
    },
    LoadWeights {
        path: PathBuf,
        selection: WeightSelection,
    },
    Train {
        learning_rate: R64,
        epoch_target: usize,
        layers: LayerSelector,
        num_train: usize,
        num_val: usize,
    },
    /// A detection run on an image of this size, as `(width, height)`.
    Detect {
        size: (u32, u32),
    },
    Drop {
        mode: DetectorMode,
    },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Creates detectors that segment the bright pixels of an image as one instance.
///
/// Detections are suppressed when the minimum confidence exceeds the detection score.
pub struct MockFactory {
    pub log: EventLog,
    pub score: R64,
    /// Training fails for these image dimensions.
    pub failing_dims: Vec<usize>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(vec![])),
            score: r64(0.85),
            failing_dims: vec![],
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }
}

impl DetectorFactory for MockFactory {
    type Detector = MockDetector;

    fn create(&mut self, mode: DetectorMode, config: &DetectorConfig) -> Result<MockDetector> {
        self.log.lock().unwrap().push(Event::Create {
            mode,
            image_dim: config.image_max_dim,
        });
        Ok(MockDetector {
            mode,
            config: config.clone(),
            log: self.log.clone(),
            score: self.score,
            fail: self.failing_dims.contains(&config.image_max_dim),
            last_epoch: None,
        })
    }
}

pub struct MockDetector {
    mode: DetectorMode,
    config: DetectorConfig,
    log: EventLog,
    score: R64,
    fail: bool,
    last_epoch: Option<usize>,
}

impl Detector for MockDetector {
    fn load_weights(&mut self, path: &Path, selection: &WeightSelection) -> Result<()> {
        self.log.lock().unwrap().push(Event::LoadWeights {
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
        assert_eq!(self.mode, DetectorMode::Training);
        if self.fail {
            bail!("out of memory");
        }
        self.log.lock().unwrap().push(Event::Train {
            learning_rate,
            epoch_target,
            layers: layers.clone(),
            num_train: train.len(),
            num_val: val.len(),
        });
        self.last_epoch = Some(epoch_target);
        Ok(())
    }

    fn find_last_checkpoint(&self) -> Result<PathBuf> {
        match self.last_epoch {
            Some(epoch) => Ok(PathBuf::from(format!("checkpoints/epoch_{:04}.ckpt", epoch))),
            None => bail!("no checkpoint was written"),
        }
    }

    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        assert_eq!(self.mode, DetectorMode::Inference);
        self.log.lock().unwrap().push(Event::Detect {
            size: image.dimensions(),
        });

        if self.score < self.config.detection_min_confidence {
            return Ok(vec![]);
        }

        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        let mask = Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
            gray.get_pixel(col as u32, row as u32).0[0] > 127
        });

        let detections = mask_bbox(mask.view())
            .map(|bbox| Detection {
                bbox,
                class_id: 1,
                score: self.score,
                mask,
            })
            .into_iter()
            .collect();
        Ok(detections)
    }
}

impl Drop for MockDetector {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.push(Event::Drop { mode: self.mode });
        }
    }
}
