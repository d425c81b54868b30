//! Per-attribute confusion matrix with a background row and column.
//!
//! Rows are predicted classes, columns are true classes. Index `num_classes`
//! on either axis is background: an unmatched ground-truth instance lands in
//! the background row of its true column, an unmatched detection in the
//! background column of its predicted row.

use serde::{Deserialize, Serialize};

use crate::metrics::iou::box_iou_matrix;
use crate::metrics::precision_recall::{calculate_precision_recall, PrecisionRecall};
use crate::types::BBoxXYXY;

/// Default minimum detection confidence for the confusion matrix.
pub const DEFAULT_CONF_THRES: f64 = 0.25;

/// Default IoU above which a detection and a label are paired.
pub const DEFAULT_IOU_THRES: f64 = 0.45;

/// Confusion matrix of one attribute head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    num_classes: usize,
    conf_thres: f64,
    iou_thres: f64,
    /// Row-major `(num_classes + 1)^2` counts
    counts: Vec<u64>,
}

impl ConfusionMatrix {
    /// Create an empty matrix with the default thresholds.
    pub fn new(num_classes: usize) -> Self {
        Self::with_thresholds(num_classes, DEFAULT_CONF_THRES, DEFAULT_IOU_THRES)
    }

    /// Create an empty matrix with explicit thresholds.
    pub fn with_thresholds(num_classes: usize, conf_thres: f64, iou_thres: f64) -> Self {
        let side = num_classes + 1;
        Self {
            num_classes,
            conf_thres,
            iou_thres,
            counts: vec![0; side * side],
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Count at (predicted, true); `num_classes` addresses background.
    pub fn get(&self, predicted: usize, truth: usize) -> u64 {
        self.counts[predicted * (self.num_classes + 1) + truth]
    }

    fn increment(&mut self, predicted: usize, truth: usize) {
        let background = self.num_classes;
        let predicted = predicted.min(background);
        let truth = truth.min(background);
        self.counts[predicted * (background + 1) + truth] += 1;
    }

    /// Update the matrix with one image.
    ///
    /// Detections at or below the confidence threshold are ignored. Pairs with
    /// IoU above the matrix threshold are assigned one-to-one by descending
    /// IoU; class agreement plays no part in the pairing.
    pub fn process_batch(
        &mut self,
        det_boxes: &[BBoxXYXY],
        det_confidences: &[f64],
        det_classes: &[usize],
        gt_boxes: &[BBoxXYXY],
        gt_classes: &[usize],
    ) {
        let kept: Vec<usize> = (0..det_boxes.len())
            .filter(|&i| det_confidences[i] > self.conf_thres)
            .collect();
        let kept_boxes: Vec<BBoxXYXY> = kept.iter().map(|&i| det_boxes[i]).collect();

        let ious = box_iou_matrix(gt_boxes, &kept_boxes);
        let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
        for (g, row) in ious.iter().enumerate() {
            for (d, &iou) in row.iter().enumerate() {
                if iou > self.iou_thres {
                    pairs.push((g, d, iou));
                }
            }
        }
        pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

        let mut gt_match: Vec<Option<usize>> = vec![None; gt_boxes.len()];
        let mut det_matched = vec![false; kept.len()];
        for (g, d, _) in pairs {
            if gt_match[g].is_none() && !det_matched[d] {
                gt_match[g] = Some(d);
                det_matched[d] = true;
            }
        }

        for (g, &truth) in gt_classes.iter().enumerate() {
            match gt_match[g] {
                Some(d) => self.increment(det_classes[kept[d]], truth),
                None => self.increment(self.num_classes, truth),
            }
        }
        for (d, &matched) in det_matched.iter().enumerate() {
            if !matched {
                self.increment(det_classes[kept[d]], self.num_classes);
            }
        }
    }

    /// Add another matrix of the same shape element-wise.
    pub fn merge(&mut self, other: &ConfusionMatrix) {
        debug_assert_eq!(self.num_classes, other.num_classes);
        for (count, &add) in self.counts.iter_mut().zip(&other.counts) {
            *count += add;
        }
    }

    /// Matrix as rows of counts, background last.
    pub fn matrix(&self) -> Vec<Vec<u64>> {
        self.counts
            .chunks(self.num_classes + 1)
            .map(<[u64]>::to_vec)
            .collect()
    }

    /// Sum of all cells.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// True and false positives per class (background excluded).
    pub fn tp_fp(&self) -> (Vec<u64>, Vec<u64>) {
        let side = self.num_classes + 1;
        (0..self.num_classes)
            .map(|c| {
                let tp = self.get(c, c);
                let row_sum: u64 = self.counts[c * side..(c + 1) * side].iter().sum();
                (tp, row_sum - tp)
            })
            .unzip()
    }

    /// Precision and recall of each class as read off the matrix.
    pub fn class_precision_recall(&self) -> Vec<PrecisionRecall> {
        let (tp, fp) = self.tp_fp();
        (0..self.num_classes)
            .map(|c| {
                let column_sum: u64 = (0..=self.num_classes).map(|p| self.get(p, c)).sum();
                calculate_precision_recall(
                    tp[c] as usize,
                    fp[c] as usize,
                    (column_sum - tp[c]) as usize,
                )
            })
            .collect()
    }

    /// Column-normalized matrix, the form confusion plots are drawn from.
    pub fn normalized(&self) -> Vec<Vec<f64>> {
        let side = self.num_classes + 1;
        let column_sums: Vec<f64> = (0..side)
            .map(|t| (0..side).map(|p| self.get(p, t)).sum::<u64>() as f64 + 1e-6)
            .collect();
        (0..side)
            .map(|p| (0..side).map(|t| self.get(p, t) as f64 / column_sums[t]).collect())
            .collect()
    }
}
