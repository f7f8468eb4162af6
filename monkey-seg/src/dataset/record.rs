use crate::common::*;

/// An annotated image without pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    /// The file name, unique within a dataset.
    pub filename: String,
    pub path: PathBuf,
    pub height: usize,
    pub width: usize,
    /// Annotated regions in annotation file order.
    pub regions: Vec<Region>,
}

impl ImageRecord {
    /// Rasterize the regions into instance masks of the image size.
    pub fn masks<A>(&self, assigner: &A) -> InstanceMasks
    where
        A: ClassAssigner + ?Sized,
    {
        InstanceMasks::build(&self.regions, self.height, self.width, assigner)
    }
}
