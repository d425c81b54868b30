//! Intersection over Union (IoU) calculation.

use crate::types::BBoxXYXY;

/// Area of a box in `XYXY` format; inverted boxes have zero area.
pub fn box_area(bbox: &BBoxXYXY) -> f64 {
    (bbox[2] - bbox[0]).max(0.0) * (bbox[3] - bbox[1]).max(0.0)
}

/// Calculate the Intersection over Union (IoU) between two boxes in `XYXY` format.
///
/// Returns a value between 0.0 (no overlap) and 1.0 (perfect overlap).
/// Degenerate boxes never produce NaN: a zero union yields 0.0.
///
/// # Example
///
/// ```
/// use multiattr_eval::metrics::iou::box_iou;
///
/// let iou = box_iou(&[0.0, 0.0, 10.0, 10.0], &[5.0, 5.0, 15.0, 15.0]);
/// assert!(iou > 0.0 && iou < 1.0);
/// ```
pub fn box_iou(box1: &BBoxXYXY, box2: &BBoxXYXY) -> f64 {
    // Calculate intersection coordinates
    let x1 = box1[0].max(box2[0]);
    let y1 = box1[1].max(box2[1]);
    let x2 = box1[2].min(box2[2]);
    let y2 = box1[3].min(box2[3]);

    let intersection_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union_area = box_area(box1) + box_area(box2) - intersection_area;

    // Avoid division by zero
    if union_area <= 0.0 {
        return 0.0;
    }

    intersection_area / union_area
}

/// Calculate IoU matrix between two sets of boxes.
///
/// Returns a 2D vector where `result[i][j]` is the IoU between `boxes1[i]` and `boxes2[j]`.
///
/// # Example
///
/// ```
/// use multiattr_eval::metrics::iou::box_iou_matrix;
///
/// let boxes1 = vec![[0.0, 0.0, 10.0, 10.0]];
/// let boxes2 = vec![[5.0, 5.0, 15.0, 15.0], [0.0, 0.0, 10.0, 10.0]];
/// let iou_matrix = box_iou_matrix(&boxes1, &boxes2);
/// assert_eq!(iou_matrix.len(), 1);
/// assert_eq!(iou_matrix[0].len(), 2);
/// ```
pub fn box_iou_matrix(boxes1: &[BBoxXYXY], boxes2: &[BBoxXYXY]) -> Vec<Vec<f64>> {
    boxes1
        .iter()
        .map(|box1| boxes2.iter().map(|box2| box_iou(box1, box2)).collect())
        .collect()
}
