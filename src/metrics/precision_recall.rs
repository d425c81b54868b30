//! Precision and Recall calculation.

use crate::threshold::NUM_IOU_THRESHOLDS;
use crate::types::CorrectnessRow;

/// Guards recall against classes without instances.
const EPS: f64 = 1e-16;

/// Container for precision and recall values.
#[derive(Debug, Clone)]
pub struct PrecisionRecall {
    pub precision: f64,
    pub recall: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// Calculate precision and recall from TP, FP, and FN counts.
///
/// # Example
///
/// ```
/// use multiattr_eval::metrics::precision_recall::calculate_precision_recall;
///
/// let pr = calculate_precision_recall(8, 2, 3);
/// assert_eq!(pr.precision, 0.8); // 8 / (8 + 2)
/// assert!((pr.recall - 0.7272).abs() < 0.001); // 8 / (8 + 3)
/// ```
pub fn calculate_precision_recall(
    true_positives: usize,
    false_positives: usize,
    false_negatives: usize,
) -> PrecisionRecall {
    let precision = if true_positives + false_positives > 0 {
        true_positives as f64 / (true_positives + false_positives) as f64
    } else {
        0.0
    };

    let recall = if true_positives + false_negatives > 0 {
        true_positives as f64 / (true_positives + false_negatives) as f64
    } else {
        0.0
    };

    PrecisionRecall {
        precision,
        recall,
        true_positives,
        false_positives,
        false_negatives,
    }
}

/// Cumulative precision and recall curves of one class, one curve per IoU threshold.
///
/// `precision[t][i]` is the precision after the `i + 1` highest-confidence
/// detections at threshold `t`.
#[derive(Debug, Clone, Default)]
pub struct PrCurves {
    pub precision: Vec<Vec<f64>>,
    pub recall: Vec<Vec<f64>>,
}

/// Build cumulative precision/recall curves from correctness rows sorted by
/// confidence (descending).
///
/// # Example
///
/// ```
/// use multiattr_eval::metrics::precision_recall::cumulative_curves;
///
/// let rows = vec![[true; 10], [false; 10]];
/// let curves = cumulative_curves(&rows, 2);
/// assert_eq!(curves.recall[0], vec![0.5, 0.5]);
/// assert_eq!(curves.precision[0], vec![1.0, 0.5]);
/// ```
pub fn cumulative_curves(correct: &[CorrectnessRow], num_labels: usize) -> PrCurves {
    let mut curves = PrCurves {
        precision: vec![Vec::with_capacity(correct.len()); NUM_IOU_THRESHOLDS],
        recall: vec![Vec::with_capacity(correct.len()); NUM_IOU_THRESHOLDS],
    };

    for t in 0..NUM_IOU_THRESHOLDS {
        let mut tp = 0usize;
        let mut fp = 0usize;
        for row in correct {
            if row[t] {
                tp += 1;
            } else {
                fp += 1;
            }
            curves.recall[t].push(tp as f64 / (num_labels as f64 + EPS));
            curves.precision[t].push(tp as f64 / (tp + fp) as f64);
        }
    }

    curves
}

/// One-dimensional piecewise-linear interpolation.
///
/// `xp` must be non-decreasing. Values below `xp[0]` yield `left`, values
/// above the last sample yield `right`; an `x` equal to the last sample
/// yields the last `fp` value.
pub fn interp(x: f64, xp: &[f64], fp: &[f64], left: f64, right: f64) -> f64 {
    let Some(&last) = xp.last() else {
        return left;
    };
    if x < xp[0] {
        return left;
    }
    if x > last {
        return right;
    }

    let j = xp.partition_point(|&v| v <= x).saturating_sub(1);
    if j + 1 >= xp.len() {
        return fp[xp.len() - 1];
    }

    let slope = (fp[j + 1] - fp[j]) / (xp[j + 1] - xp[j]);
    slope * (x - xp[j]) + fp[j]
}

/// Interpolate a curve sampled at descending `confidences` onto `grid`.
///
/// Used to express per-class precision/recall as functions of the confidence
/// threshold.
pub fn curve_over_confidence(grid: &[f64], confidences: &[f64], values: &[f64], left: f64) -> Vec<f64> {
    let xp: Vec<f64> = confidences.iter().map(|c| -c).collect();
    let right = values.last().copied().unwrap_or(left);
    grid.iter()
        .map(|&x| interp(-x, &xp, values, left, right))
        .collect()
}
