use crate::{common::*, ClassAssigner, Region};

/// Stacked per-instance binary masks with aligned class ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceMasks {
    /// Boolean masks in `(height, width, instance)` layout.
    pub masks: Array3<bool>,
    /// Class id of each mask plane.
    pub class_ids: Array1<i32>,
}

impl InstanceMasks {
    /// Rasterize the polygon of each region into its own plane.
    ///
    /// Planes are independent. Pixels covered by several polygons are set in every
    /// corresponding plane.
    pub fn build<A>(regions: &[Region], height: usize, width: usize, assigner: &A) -> Self
    where
        A: ClassAssigner + ?Sized,
    {
        let mut masks = Array3::from_elem((height, width, regions.len()), false);

        for (index, region) in regions.iter().enumerate() {
            region
                .polygon
                .rasterize_into(masks.index_axis_mut(Axis(2), index));
        }

        let class_ids: Vec<_> = regions
            .iter()
            .map(|region| assigner.class_id(region))
            .collect();

        Self {
            masks,
            class_ids: Array1::from_vec(class_ids),
        }
    }

    pub fn height(&self) -> usize {
        self.masks.dim().0
    }

    pub fn width(&self) -> usize {
        self.masks.dim().1
    }

    pub fn num_instances(&self) -> usize {
        self.masks.dim().2
    }

    pub fn plane(&self, index: usize) -> ArrayView2<'_, bool> {
        self.masks.index_axis(Axis(2), index)
    }

    /// The bounding box of each plane. Empty planes have no box.
    pub fn bboxes(&self) -> Vec<Option<TLBR<usize>>> {
        (0..self.num_instances())
            .map(|index| mask_bbox(self.plane(index)))
            .collect()
    }
}

/// The tightest box covering every set pixel of a mask.
pub fn mask_bbox(mask: ArrayView2<'_, bool>) -> Option<TLBR<usize>> {
    let (rows, cols): (Vec<_>, Vec<_>) = mask
        .indexed_iter()
        .filter(|&(_, &value)| value)
        .map(|(index, _)| index)
        .unzip();
    let (t, b) = rows.into_iter().minmax().into_option()?;
    let (l, r) = cols.into_iter().minmax().into_option()?;
    TLBR::try_from_tlbr([t, l, b + 1, r + 1]).ok()
}

/// Intersection over union of two masks of the same shape.
///
/// Two empty masks have zero IoU.
pub fn mask_iou(lhs: ArrayView2<'_, bool>, rhs: ArrayView2<'_, bool>) -> Result<f64> {
    ensure!(
        lhs.dim() == rhs.dim(),
        "mask shapes {:?} and {:?} differ",
        lhs.dim(),
        rhs.dim()
    );

    let (inter, union) = lhs
        .iter()
        .zip(rhs.iter())
        .fold((0usize, 0usize), |(inter, union), (&lhs, &rhs)| {
            ((inter + (lhs && rhs) as usize), (union + (lhs || rhs) as usize))
        });

    if union == 0 {
        Ok(0.0)
    } else {
        Ok(inter as f64 / union as f64)
    }
}
