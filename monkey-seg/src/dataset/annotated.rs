use super::{DatasetLayout, ImageRecord, ViaAnnotations};
use crate::{common::*, error::DatasetError};

/// Class id reserved for the background.
pub const BACKGROUND_CLASS_ID: i32 = 0;
/// Class id of the single foreground class.
pub const MONKEY_CLASS_ID: i32 = 1;
pub const MONKEY_CLASS_NAME: &str = "monkey";

/// Images with polygon annotations, restricted to a subset of file names.
///
/// Records are immutable. Masks are rasterized on every request.
#[derive(Debug, Clone)]
pub struct AnnotatedDataset {
    records: Vec<ImageRecord>,
    class_assigner: Arc<dyn ClassAssigner>,
}

impl AnnotatedDataset {
    /// Load the annotated images of the dataset whose file names are in `subset`.
    ///
    /// Every region is assigned to the monkey class.
    pub fn load<S>(layout: &DatasetLayout, subset: &[S]) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let annotations = ViaAnnotations::open(layout.annotation_path())?;
        Self::from_annotations(
            layout,
            &annotations,
            subset,
            Arc::new(ConstantClass(MONKEY_CLASS_ID)),
        )
    }

    /// Build a dataset from already parsed annotations.
    ///
    /// Images without regions are skipped. The record order follows the annotation order.
    /// The size of every selected image is read from its file header.
    pub fn from_annotations<S>(
        layout: &DatasetLayout,
        annotations: &ViaAnnotations,
        subset: &[S],
        class_assigner: Arc<dyn ClassAssigner>,
    ) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let subset: HashSet<&str> = subset.iter().map(|name| name.as_ref()).collect();

        let records: Vec<_> = annotations
            .annotated()
            .filter(|image| subset.contains(image.filename.as_str()))
            .map(|image| -> Result<_> {
                let path = layout.image_path(&image.filename);
                let imagesize::ImageSize { width, height } =
                    imagesize::size(&path).map_err(|err| DatasetError::MissingImage {
                        path: path.clone(),
                        reason: err.to_string(),
                    })?;

                Ok(ImageRecord {
                    filename: image.filename.clone(),
                    path,
                    height,
                    width,
                    regions: image.regions.clone(),
                })
            })
            .try_collect()?;

        // such images score undefined when they are evaluated
        records
            .iter()
            .filter(|record| {
                record
                    .masks(&*class_assigner)
                    .bboxes()
                    .iter()
                    .all(Option::is_none)
            })
            .for_each(|record| {
                warn!(
                    "no region of '{}' covers a pixel of the image",
                    record.filename
                );
            });

        if records.len() < subset.len() {
            debug!(
                "{} of {} requested images have annotated regions",
                records.len(),
                subset.len()
            );
        }

        Ok(Self {
            records,
            class_assigner,
        })
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn image_ids(&self) -> Range<usize> {
        0..self.records.len()
    }

    pub fn record(&self, image_id: usize) -> Result<&ImageRecord> {
        self.records
            .get(image_id)
            .ok_or_else(|| DatasetError::UnknownImage { id: image_id }.into())
    }

    /// Rasterize the instance masks of an image.
    pub fn get_mask(&self, image_id: usize) -> Result<InstanceMasks> {
        let record = self.record(image_id)?;
        Ok(record.masks(&*self.class_assigner))
    }

    /// The path of an image file.
    pub fn get_reference(&self, image_id: usize) -> Result<&Path> {
        Ok(&self.record(image_id)?.path)
    }
}
