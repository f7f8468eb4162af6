use crate::common::*;

/// Run-length encoded binary mask.
///
/// Pixels are visited in row-major order. Runs alternate between unset and set pixels,
/// starting with an unset run that may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rle {
    /// `[height, width]` of the mask.
    pub size: [usize; 2],
    pub counts: Vec<usize>,
}

impl Rle {
    pub fn encode(mask: ArrayView2<'_, bool>) -> Self {
        let (height, width) = mask.dim();
        let mut counts = vec![];
        let mut current = false;
        let mut run = 0;

        for &value in mask.iter() {
            if value != current {
                counts.push(run);
                current = value;
                run = 0;
            }
            run += 1;
        }
        counts.push(run);

        Self {
            size: [height, width],
            counts,
        }
    }

    pub fn decode(&self) -> Result<Array2<bool>> {
        let [height, width] = self.size;
        let num_pixels = height
            .checked_mul(width)
            .ok_or_else(|| format_err!("mask size {}x{} overflows", height, width))?;
        let total = self
            .counts
            .iter()
            .try_fold(0usize, |sum, &count| sum.checked_add(count))
            .ok_or_else(|| format_err!("run lengths overflow"))?;
        ensure!(
            total == num_pixels,
            "run lengths sum to {} but the mask has {} pixels",
            total,
            num_pixels
        );

        let values: Vec<bool> = self
            .counts
            .iter()
            .enumerate()
            .flat_map(|(index, &count)| std::iter::repeat(index % 2 == 1).take(count))
            .collect();
        let mask = Array2::from_shape_vec((height, width), values)
            .map_err(|err| format_err!("invalid mask shape: {}", err))?;
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rle_counts_start_with_unset_run() {
        let mut mask = Array2::from_elem((2, 3), false);
        mask[[0, 0]] = true;
        mask[[1, 1]] = true;
        mask[[1, 2]] = true;

        let rle = Rle::encode(mask.view());
        assert_eq!(rle.size, [2, 3]);
        assert_eq!(rle.counts, vec![0, 1, 3, 2]);
        assert_eq!(rle.decode().unwrap(), mask);
    }

    #[test]
    fn rle_from_json() {
        let rle: Rle = serde_json::from_str(r#"{"size": [2, 2], "counts": [1, 2, 1]}"#).unwrap();
        let mask = rle.decode().unwrap();
        assert!(!mask[[0, 0]]);
        assert!(mask[[0, 1]]);
        assert!(mask[[1, 0]]);
        assert!(!mask[[1, 1]]);
    }

    #[test]
    fn rle_rejects_wrong_total() {
        let rle = Rle {
            size: [2, 2],
            counts: vec![1, 2],
        };
        assert!(rle.decode().is_err());
    }

    #[test]
    fn rle_rejects_overflowing_sizes() {
        let rle = Rle {
            size: [usize::MAX, 2],
            counts: vec![0, 1],
        };
        assert!(rle.decode().is_err());

        let rle = Rle {
            size: [1, 1],
            counts: vec![usize::MAX, 2],
        };
        assert!(rle.decode().is_err());
    }
}
