use crate::common::*;
use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::{s, Array3};

/// Fits an image into a `dim` by `dim` square the way the detector sees it.
///
/// The image is scaled so its longer side fits the square, and scaled up when its
/// shorter side is below `dim`. The scaled image is centered and the margins are
/// zero padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareResize {
    pub height: usize,
    pub width: usize,
    pub dim: usize,
    pub scaled_height: usize,
    pub scaled_width: usize,
    pub top: usize,
    pub left: usize,
}

impl SquareResize {
    pub fn new(height: usize, width: usize, dim: usize) -> Result<Self> {
        ensure!(
            height > 0 && width > 0,
            "cannot resize an empty {}x{} image",
            height,
            width
        );
        ensure!(dim > 0, "the square side must be positive");

        let (min_side, max_side) = (height.min(width) as f64, height.max(width) as f64);
        let mut scale = (dim as f64 / min_side).max(1.0);
        if (max_side * scale).round() > dim as f64 {
            scale = dim as f64 / max_side;
        }

        let scaled_height = ((height as f64 * scale).round() as usize).clamp(1, dim);
        let scaled_width = ((width as f64 * scale).round() as usize).clamp(1, dim);

        Ok(Self {
            height,
            width,
            dim,
            scaled_height,
            scaled_width,
            top: (dim - scaled_height) / 2,
            left: (dim - scaled_width) / 2,
        })
    }

    /// Bilinearly scale the image and pad it to the square. The output is RGB.
    pub fn image(&self, image: &DynamicImage) -> DynamicImage {
        let resized = imageops::resize(
            &image.to_rgb8(),
            self.scaled_width as u32,
            self.scaled_height as u32,
            FilterType::Triangle,
        );
        let mut canvas = RgbImage::new(self.dim as u32, self.dim as u32);
        imageops::replace(&mut canvas, &resized, self.left as u32, self.top as u32);
        DynamicImage::ImageRgb8(canvas)
    }

    /// Scale the instance masks by nearest neighbour and pad them to the square.
    pub fn masks(&self, masks: &InstanceMasks) -> Result<InstanceMasks> {
        ensure!(
            (masks.height(), masks.width()) == (self.height, self.width),
            "expect {}x{} masks, but get {}x{}",
            self.height,
            self.width,
            masks.height(),
            masks.width()
        );

        let rows = nearest_indices(self.height, self.scaled_height);
        let cols = nearest_indices(self.width, self.scaled_width);
        let num_instances = masks.num_instances();

        let scaled = Array3::from_shape_fn(
            (self.scaled_height, self.scaled_width, num_instances),
            |(row, col, index)| masks.masks[[rows[row], cols[col], index]],
        );
        let mut padded = Array3::from_elem((self.dim, self.dim, num_instances), false);
        padded
            .slice_mut(s![
                self.top..(self.top + self.scaled_height),
                self.left..(self.left + self.scaled_width),
                ..
            ])
            .assign(&scaled);

        Ok(InstanceMasks {
            masks: padded,
            class_ids: masks.class_ids.clone(),
        })
    }
}

/// Source indices of an `output`-long axis sampled from an `input`-long axis, with
/// both end points aligned.
fn nearest_indices(input: usize, output: usize) -> Vec<usize> {
    if output <= 1 {
        return vec![0; output];
    }
    let ratio = (input - 1) as f64 / (output - 1) as f64;
    (0..output)
        .map(|index| ((index as f64 * ratio).round() as usize).min(input - 1))
        .collect()
}
