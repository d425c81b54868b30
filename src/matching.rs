//! Greedy matching of detections against ground truth across the IoU vector.

use std::collections::BTreeSet;

use crate::metrics::iou::box_iou;
use crate::threshold::NUM_IOU_THRESHOLDS;
use crate::types::{BBoxXYXY, CorrectnessRow};

/// Build the correctness matrix of one image.
///
/// Matching is restricted to equal classes. Within a class, detections are
/// visited in descending confidence; each one looks up its best-IoU label of
/// that class. If the IoU exceeds the lowest threshold and the label is still
/// unclaimed, the label is claimed and the detection's row is set at every
/// threshold the IoU exceeds. A detection whose best label was already
/// claimed stays incorrect. Matching ends once every label is claimed.
///
/// # Arguments
///
/// * `det_boxes` - Detection boxes (original image pixels)
/// * `det_confidences` - Detection confidences
/// * `det_classes` - Detection classes used for matching
/// * `gt_boxes` - Label boxes (original image pixels)
/// * `gt_classes` - Label classes used for matching
/// * `iouv` - The IoU threshold vector
///
/// # Example
///
/// ```
/// use multiattr_eval::matching::correctness_matrix;
/// use multiattr_eval::threshold::iou_vector;
///
/// let boxes = vec![[0.0, 0.0, 10.0, 10.0]];
/// let correct = correctness_matrix(&boxes, &[0.9], &[0], &boxes, &[0], &iou_vector());
/// assert_eq!(correct, vec![[true; 10]]);
/// ```
pub fn correctness_matrix(
    det_boxes: &[BBoxXYXY],
    det_confidences: &[f64],
    det_classes: &[usize],
    gt_boxes: &[BBoxXYXY],
    gt_classes: &[usize],
    iouv: &[f64; NUM_IOU_THRESHOLDS],
) -> Vec<CorrectnessRow> {
    let mut correct = vec![[false; NUM_IOU_THRESHOLDS]; det_boxes.len()];
    if gt_boxes.is_empty() || det_boxes.is_empty() {
        return correct;
    }

    // Stable: equal confidences keep detection order
    let mut order: Vec<usize> = (0..det_boxes.len()).collect();
    order.sort_by(|&a, &b| {
        det_confidences[b]
            .partial_cmp(&det_confidences[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let classes: BTreeSet<usize> = gt_classes.iter().copied().collect();
    let mut claimed = vec![false; gt_boxes.len()];
    let mut claimed_count = 0;

    'classes: for class in classes {
        let targets: Vec<usize> = (0..gt_boxes.len())
            .filter(|&g| gt_classes[g] == class)
            .collect();

        for &d in order.iter().filter(|&&d| det_classes[d] == class) {
            let best = targets
                .iter()
                .map(|&g| (g, box_iou(&det_boxes[d], &gt_boxes[g])))
                .fold(None, |best: Option<(usize, f64)>, (g, iou)| match best {
                    Some((_, best_iou)) if best_iou >= iou => best,
                    _ => Some((g, iou)),
                });

            let Some((g, iou)) = best else {
                continue;
            };
            if iou <= iouv[0] || claimed[g] {
                continue;
            }

            claimed[g] = true;
            claimed_count += 1;
            for (t, &threshold) in iouv.iter().enumerate() {
                correct[d][t] = iou > threshold;
            }
            if claimed_count == gt_boxes.len() {
                break 'classes;
            }
        }
    }

    correct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::iou_vector;

    #[test]
    fn test_perfect_match() {
        let boxes = vec![[10.0, 10.0, 60.0, 60.0]];
        let correct = correctness_matrix(&boxes, &[0.9], &[1], &boxes, &[1], &iou_vector());
        assert_eq!(correct, vec![[true; NUM_IOU_THRESHOLDS]]);
    }

    #[test]
    fn test_class_mismatch_is_incorrect() {
        let boxes = vec![[10.0, 10.0, 60.0, 60.0]];
        let correct = correctness_matrix(&boxes, &[0.9], &[0], &boxes, &[1], &iou_vector());
        assert_eq!(correct, vec![[false; NUM_IOU_THRESHOLDS]]);
    }

    #[test]
    fn test_partial_thresholds() {
        // IoU = 0.78: correct up to 0.75, incorrect from 0.80 on
        let det = vec![[0.0, 0.0, 10.0, 7.8]];
        let gt = vec![[0.0, 0.0, 10.0, 10.0]];
        let correct = correctness_matrix(&det, &[0.9], &[0], &gt, &[0], &iou_vector());
        assert_eq!(
            correct[0],
            [true, true, true, true, true, true, false, false, false, false]
        );
    }

    #[test]
    fn test_confidence_order_claims_first() {
        // IoU 0.9 with confidence 0.8 beats IoU 0.95 with confidence 0.6
        let gt = vec![[0.0, 0.0, 100.0, 100.0]];
        let det = vec![[0.0, 0.0, 100.0, 95.0], [0.0, 0.0, 100.0, 90.0]];
        let correct = correctness_matrix(&det, &[0.6, 0.8], &[0, 0], &gt, &[0], &iou_vector());
        assert!(correct[1][0]);
        assert_eq!(correct[0], [false; NUM_IOU_THRESHOLDS]);
    }

    #[test]
    fn test_no_labels() {
        let det = vec![[0.0, 0.0, 1.0, 1.0]];
        let correct = correctness_matrix(&det, &[0.9], &[0], &[], &[], &iou_vector());
        assert_eq!(correct, vec![[false; NUM_IOU_THRESHOLDS]]);
    }

    #[test]
    fn test_two_labels_two_detections() {
        let gt = vec![[0.0, 0.0, 10.0, 10.0], [50.0, 50.0, 60.0, 60.0]];
        let det = vec![[50.0, 50.0, 60.0, 60.0], [0.0, 0.0, 10.0, 10.0]];
        let correct = correctness_matrix(&det, &[0.5, 0.7], &[0, 0], &gt, &[0, 0], &iou_vector());
        assert_eq!(correct, vec![[true; NUM_IOU_THRESHOLDS]; 2]);
    }
}
