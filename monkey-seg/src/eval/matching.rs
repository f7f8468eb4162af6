use super::{ApCalculator, ApScore, Undefined};
use crate::{common::*, detector::Detection};
use label::{mask_bbox, mask_iou};

/// The IoU a predicted mask needs to match a ground truth mask.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.5;

/// The outcome of matching one detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionMatch {
    /// Index of the detection in the input list.
    pub detection_index: usize,
    pub score: R64,
    /// Index of the matched ground truth instance.
    pub ground_truth: Option<usize>,
}

impl DetectionMatch {
    pub fn is_tp(&self) -> bool {
        self.ground_truth.is_some()
    }
}

/// Greedily match detections to ground truth instances by mask IoU.
///
/// Detections are visited in decreasing score order. Each one takes the unmatched ground
/// truth instance with the highest IoU, provided the IoU reaches the threshold and the
/// class ids agree. Returns the matches in visiting order.
///
/// Ground truth planes without any set pixel are ignored.
pub fn match_detections(
    detections: &[Detection],
    ground_truth: &InstanceMasks,
    iou_threshold: R64,
) -> Result<Vec<DetectionMatch>> {
    let (gt_indices, gt_bboxes): (Vec<usize>, Vec<_>) = ground_truth
        .bboxes()
        .into_iter()
        .enumerate()
        .filter_map(|(index, bbox)| Some((index, bbox?)))
        .unzip();

    let order: Vec<usize> = (0..detections.len())
        .sorted_by_key(|&index| Reverse(detections[index].score))
        .collect();
    let mut gt_matched = vec![false; gt_indices.len()];

    let matches: Vec<_> = order
        .into_iter()
        .map(|det_index| -> Result<_> {
            let detection = &detections[det_index];
            let det_bbox = mask_bbox(detection.mask.view());

            let ious: Vec<(usize, R64)> = gt_indices
                .iter()
                .zip(&gt_bboxes)
                .enumerate()
                .map(|(slot, (&gt_index, gt_bbox))| -> Result<_> {
                    let overlaps = match &det_bbox {
                        Some(det_bbox) => det_bbox.intersect_with(gt_bbox).is_some(),
                        None => false,
                    };
                    let iou = if overlaps {
                        mask_iou(detection.mask.view(), ground_truth.plane(gt_index))?
                    } else {
                        0.0
                    };
                    Ok((slot, r64(iou)))
                })
                .try_collect()?;

            let matched = ious
                .into_iter()
                .sorted_by_key(|&(_, iou)| Reverse(iou))
                .filter(|&(slot, _)| !gt_matched[slot])
                .take_while(|&(_, iou)| iou >= iou_threshold)
                .find(|&(slot, _)| ground_truth.class_ids[gt_indices[slot]] == detection.class_id)
                .map(|(slot, _)| slot);

            if let Some(slot) = matched {
                gt_matched[slot] = true;
            }

            Ok(DetectionMatch {
                detection_index: det_index,
                score: detection.score,
                ground_truth: matched.map(|slot| gt_indices[slot]),
            })
        })
        .try_collect()?;

    Ok(matches)
}

/// The number of ground truth instances with at least one set pixel.
pub fn num_visible_instances(ground_truth: &InstanceMasks) -> usize {
    ground_truth
        .bboxes()
        .iter()
        .filter(|bbox| bbox.is_some())
        .count()
}

/// The mask average precision of the detections on one image.
///
/// The score is undefined when the image has no visible ground truth instance.
pub fn image_average_precision(
    calculator: &ApCalculator,
    detections: &[Detection],
    ground_truth: &InstanceMasks,
    iou_threshold: R64,
) -> Result<ApScore> {
    let num_gt = num_visible_instances(ground_truth);
    if num_gt == 0 {
        return Ok(ApScore::Undefined(Undefined::NoGroundTruth));
    }

    let matches = match_detections(detections, ground_truth, iou_threshold)?;
    let ap = calculator.compute_by_matches(matches.iter().map(DetectionMatch::is_tp), num_gt)?;
    Ok(ApScore::Defined(ap))
}
