//! Multi-attribute Non-Maximum Suppression (`NMS`)
//!
//! Converts raw network rows, each carrying one box, one objectness score and
//! one class-score vector per attribute head, into a deduplicated detection
//! list. Only detections sharing the attribute-0 class compete with each other.

use log::debug;

use crate::error::{EvalError, Result};
use crate::geometry::xywh_to_xyxy;
use crate::metrics::iou::box_iou;
use crate::threshold::validate_threshold;
use crate::types::{BBoxXYXY, CandidateRow, Detection};

/// Per-class box offset; larger than any image side in pixels.
pub const MAX_WH: f64 = 4096.0;

/// Parameters of a multi-attribute `NMS` run.
#[derive(Debug, Clone, PartialEq)]
pub struct NmsParams {
    /// Minimum fused confidence (objectness x class score)
    pub conf_thres: f64,
    /// `IoU` above which the lower-confidence box is suppressed
    pub iou_thres: f64,
    /// Maximum detections kept per image
    pub max_det: usize,
    /// Maximum candidates entering the greedy pass
    pub max_nms: usize,
    /// Keep a row when any attribute passes `conf_thres`, not only attribute 0
    pub multi_label: bool,
    /// Let boxes of different attribute-0 classes suppress each other
    pub agnostic: bool,
}

impl Default for NmsParams {
    fn default() -> Self {
        Self {
            conf_thres: 0.001,
            iou_thres: 0.65,
            max_det: 300,
            max_nms: 30_000,
            multi_label: true,
            agnostic: false,
        }
    }
}

impl NmsParams {
    /// Check thresholds and caps.
    ///
    /// # Errors
    ///
    /// Returns error if a threshold is outside [0.0, 1.0] or a cap is zero.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.conf_thres)?;
        validate_threshold(self.iou_thres)?;
        if self.max_det == 0 || self.max_nms == 0 {
            return Err(EvalError::InvalidConfig(
                "max_det and max_nms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Arg-max class and fused score of every attribute head of a row.
fn fuse_scores(row: &CandidateRow) -> (Vec<usize>, Vec<f64>) {
    row.class_scores
        .iter()
        .map(|scores| {
            let (best_class, best_score) = scores
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (idx, &score)| {
                    if score > best.1 {
                        (idx, score)
                    } else {
                        best
                    }
                });
            let best_score = if best_score.is_finite() { best_score } else { 0.0 };
            (best_class, row.objectness * best_score)
        })
        .unzip()
}

/// Turn a raw row into a detection if it passes the confidence filter.
fn row_to_detection(row: &CandidateRow, params: &NmsParams) -> Option<Detection> {
    if row.objectness.is_nan() || row.objectness <= 0.0 {
        return None;
    }

    let (attribute_classes, attribute_scores) = fuse_scores(row);
    let confidence = *attribute_scores.first()?;

    let passes = if params.multi_label {
        attribute_scores.iter().any(|&score| score >= params.conf_thres)
    } else {
        confidence >= params.conf_thres
    };
    if !passes {
        return None;
    }

    Some(Detection {
        bbox: xywh_to_xyxy(row.bbox),
        confidence,
        attribute_classes,
        attribute_scores,
    })
}

/// Box shifted by its group offset so that different groups never overlap.
fn offset_box(detection: &Detection, agnostic: bool) -> BBoxXYXY {
    let offset = if agnostic {
        0.0
    } else {
        detection.primary_class() as f64 * MAX_WH
    };
    [
        detection.bbox[0] + offset,
        detection.bbox[1] + offset,
        detection.bbox[2] + offset,
        detection.bbox[3] + offset,
    ]
}

/// Greedy suppression over detections of any origin.
///
/// Detections are stably sorted by confidence (descending), the pool is capped
/// at `max_nms`, and a detection is kept when its `IoU` with every kept box of
/// the same group is <= `iou_thres`. At most `max_det` detections are returned,
/// in descending confidence order.
pub fn suppress(mut detections: Vec<Detection>, params: &NmsParams) -> Vec<Detection> {
    // Stable: equal confidences keep input order
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if detections.len() > params.max_nms {
        debug!(
            "NMS candidate pool capped at {} (had {})",
            params.max_nms,
            detections.len()
        );
        detections.truncate(params.max_nms);
    }

    let mut kept: Vec<Detection> = Vec::new();
    let mut kept_boxes: Vec<BBoxXYXY> = Vec::new();

    for detection in detections {
        if kept.len() >= params.max_det {
            break;
        }
        let candidate = offset_box(&detection, params.agnostic);
        let overlaps = kept_boxes
            .iter()
            .any(|kept_box| box_iou(kept_box, &candidate) > params.iou_thres);
        if !overlaps {
            kept_boxes.push(candidate);
            kept.push(detection);
        }
    }

    kept
}

/// Apply multi-attribute Non-Maximum Suppression to the rows of one image.
///
/// `hybrid_labels` are injected as extra candidates with confidence 1.0 before
/// suppression (boxes in inference-frame pixels, `XYXY`).
///
/// # Errors
///
/// Returns error if `params` are invalid.
///
/// # Examples
///
/// ```
/// # use multiattr_eval::nms::{non_max_suppression_multi_attr, NmsParams};
/// # use multiattr_eval::types::CandidateRow;
/// let rows = vec![
///     CandidateRow::new([30.0, 30.0, 40.0, 40.0], 0.9, vec![vec![0.1, 0.9], vec![1.0]]),
///     CandidateRow::new([32.0, 32.0, 40.0, 40.0], 0.8, vec![vec![0.2, 0.8], vec![1.0]]),
///     CandidateRow::new([300.0, 300.0, 40.0, 40.0], 0.7, vec![vec![0.9, 0.1], vec![1.0]]),
/// ];
/// let kept = non_max_suppression_multi_attr(&rows, &NmsParams::default(), &[]).unwrap();
/// assert_eq!(kept.len(), 2);
/// assert_eq!(kept[0].attribute_classes, vec![1, 0]);
/// ```
pub fn non_max_suppression_multi_attr(
    rows: &[CandidateRow],
    params: &NmsParams,
    hybrid_labels: &[Detection],
) -> Result<Vec<Detection>> {
    params.validate()?;

    let mut candidates: Vec<Detection> = hybrid_labels
        .iter()
        .map(|label| Detection::new(label.bbox, 1.0, label.attribute_classes.clone()))
        .collect();
    candidates.extend(rows.iter().filter_map(|row| row_to_detection(row, params)));

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    Ok(suppress(candidates, params))
}
