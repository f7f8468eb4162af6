use crate::common::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrecRec<T>
where
    T: Copy,
{
    pub precision: T,
    pub recall: T,
}

/// How the area under the precision/recall envelope is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegralMethod {
    /// The exact area under the stepwise envelope, as in PASCAL VOC 2010 and later.
    Continuous,
    /// The mean envelope precision at N evenly spaced recall levels from 0 to 1.
    Interpolation(usize),
}

impl Default for IntegralMethod {
    fn default() -> Self {
        Self::Continuous
    }
}

#[derive(Debug, Clone)]
pub struct ApCalculator {
    integral_method: IntegralMethod,
}

impl Default for ApCalculator {
    fn default() -> Self {
        Self {
            integral_method: IntegralMethod::Continuous,
        }
    }
}

impl ApCalculator {
    pub fn new(integral_method: IntegralMethod) -> Result<Self> {
        if let IntegralMethod::Interpolation(n_points) = integral_method {
            ensure!(
                n_points >= 2,
                "invalid number of interpolated points {}",
                n_points
            );
        }

        Ok(Self { integral_method })
    }

    /// Compute average precision from a precision/recall curve.
    ///
    /// The input precision/recall list must be ordered by non-decreasing recall. The curve
    /// starts at recall 0 with precision 0 and ends at recall 1 with precision 0. An empty
    /// curve has zero area.
    pub fn compute_by_prec_rec(&self, sorted_prec_rec: &[impl Borrow<PrecRec<R64>>]) -> R64 {
        // compute precision envelope
        let enveloped = {
            let first = PrecRec {
                precision: r64(0.0),
                recall: r64(0.0),
            };
            let last = PrecRec {
                precision: r64(0.0),
                recall: r64(1.0),
            };

            // append/prepend sentinel values
            let iter = {
                iter::once(&first)
                    .chain(sorted_prec_rec.iter().map(Borrow::borrow))
                    .chain(iter::once(&last))
            };

            let mut list: Vec<PrecRec<R64>> = vec![];

            for &PrecRec { precision, recall } in iter.rev() {
                match list.last_mut() {
                    Some(last) => {
                        let max_precision = last.precision.max(precision);

                        if last.recall == recall {
                            last.precision = max_precision;
                        } else {
                            list.push(PrecRec {
                                recall,
                                precision: max_precision,
                            });
                        }
                    }
                    None => list.push(PrecRec { precision, recall }),
                }
            }

            list.reverse();
            list
        };

        // compute ap
        match self.integral_method {
            IntegralMethod::Interpolation(n_points) => {
                let sum: R64 = (0..n_points)
                    .map(|index| r64(index as f64 / (n_points - 1) as f64))
                    .map(|recall| {
                        enveloped
                            .iter()
                            .find(|prec_rec| prec_rec.recall >= recall)
                            .map(|prec_rec| prec_rec.precision)
                            .unwrap_or_else(|| r64(0.0))
                    })
                    .sum();
                sum / n_points as f64
            }
            IntegralMethod::Continuous => enveloped
                .iter()
                .tuple_windows()
                .map(|(prev, next)| (next.recall - prev.recall) * next.precision)
                .sum(),
        }
    }

    /// Compute average precision from detections ordered by decreasing confidence.
    ///
    /// Each item tells whether the detection is a true positive.
    pub fn compute_by_matches<I>(&self, is_tp: I, num_ground_truth: usize) -> Result<R64>
    where
        I: IntoIterator<Item = bool>,
    {
        ensure!(
            num_ground_truth > 0,
            "average precision needs at least one ground truth instance"
        );

        // compute precision and recall, it is ordered by increasing recall automatically
        let prec_rec: Vec<_> = is_tp
            .into_iter()
            .enumerate()
            .scan(0, |acc_tp, (index, is_tp)| {
                *acc_tp += is_tp as usize;
                let acc_tp = r64(*acc_tp as f64);
                Some(PrecRec {
                    precision: acc_tp / (index + 1) as f64,
                    recall: acc_tp / num_ground_truth as f64,
                })
            })
            .collect();

        Ok(self.compute_by_prec_rec(&prec_rec))
    }
}
