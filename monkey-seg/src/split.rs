//! Seeded k-fold partitioning and train/validation splits.

use crate::common::*;

/// Fraction of a fold's training portion held out for validation during training.
pub const DEFAULT_VAL_FRACTION: f64 = 0.1;

/// One k-fold partition in index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl Fold {
    /// Pick the items at the train and test indices.
    pub fn select<T>(&self, items: &[T]) -> (Vec<T>, Vec<T>)
    where
        T: Clone,
    {
        let pick = |indices: &[usize]| -> Vec<T> {
            indices.iter().map(|&index| items[index].clone()).collect()
        };
        (pick(&self.train_indices), pick(&self.test_indices))
    }
}

/// Shuffled k-fold cross-validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldSplitter {
    pub num_folds: usize,
    pub seed: u64,
}

impl FoldSplitter {
    pub fn new(num_folds: usize, seed: u64) -> Result<Self> {
        ensure!(
            num_folds >= 2,
            "the number of folds must be at least 2, but got {}",
            num_folds
        );
        Ok(Self { num_folds, seed })
    }

    /// Partition `num_items` items into folds.
    ///
    /// The indices are shuffled with the seed and cut into `num_folds` contiguous
    /// partitions, where the first `num_items % num_folds` partitions hold one extra
    /// item. The i-th fold tests on the i-th partition and trains on the others. Both
    /// index lists are sorted.
    pub fn split(&self, num_items: usize) -> Result<Vec<Fold>> {
        let Self { num_folds, seed } = *self;
        ensure!(
            num_folds >= 2,
            "the number of folds must be at least 2, but got {}",
            num_folds
        );
        ensure!(
            num_folds <= num_items,
            "cannot split {} items into {} folds",
            num_items,
            num_folds
        );

        let mut indices: Vec<usize> = (0..num_items).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let base_size = num_items / num_folds;
        let num_larger = num_items % num_folds;

        let folds: Vec<_> = (0..num_folds)
            .scan(0, |start, fold_index| {
                let size = base_size + (fold_index < num_larger) as usize;
                let range = *start..(*start + size);
                *start += size;
                Some(range)
            })
            .map(|range| {
                let test_indices: Vec<_> =
                    indices[range.clone()].iter().cloned().sorted().collect();
                let train_indices: Vec<_> = indices[..range.start]
                    .iter()
                    .chain(&indices[range.end..])
                    .cloned()
                    .sorted()
                    .collect();
                Fold {
                    train_indices,
                    test_indices,
                }
            })
            .collect();

        Ok(folds)
    }
}

/// Shuffle the items with the seed and cut off `ceil(len * fraction)` items from the
/// front as the held-out part. Returns `(kept, held_out)`.
///
/// Both parts must be non-empty.
pub fn holdout_split<T>(items: &[T], fraction: f64, seed: u64) -> Result<(Vec<T>, Vec<T>)>
where
    T: Clone,
{
    ensure!(
        fraction > 0.0 && fraction < 1.0,
        "the held-out fraction must be in (0, 1), but got {}",
        fraction
    );

    let num_items = items.len();
    let num_held_out = (num_items as f64 * fraction).ceil() as usize;
    ensure!(
        num_held_out >= 1 && num_held_out < num_items,
        "holding out a fraction {} of {} items leaves one side empty",
        fraction,
        num_items
    );

    let mut indices: Vec<usize> = (0..num_items).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (held_out, kept) = indices.split_at(num_held_out);
    let pick = |indices: &[usize]| -> Vec<T> {
        indices.iter().map(|&index| items[index].clone()).collect()
    };
    Ok((pick(kept), pick(held_out)))
}

/// Split a fold's training portion into the training and validation subsets used
/// while training.
pub fn nested_validation_split<T>(
    train_items: &[T],
    val_fraction: f64,
    seed: u64,
) -> Result<(Vec<T>, Vec<T>)>
where
    T: Clone,
{
    holdout_split(train_items, val_fraction, seed)
        .with_context(|| format!("cannot split {} items for validation", train_items.len()))
}
