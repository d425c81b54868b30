//! Average Precision (AP) and mean Average Precision (mAP) calculation.

use serde::{Deserialize, Serialize};

use crate::metrics::f1_score::{best_mean_f1_index, calculate_f1_score};
use crate::metrics::precision_recall::{cumulative_curves, curve_over_confidence, interp};
use crate::threshold::{linspace, NUM_IOU_THRESHOLDS};
use crate::types::{AttributeMetrics, ClassMetrics, CorrectnessRow};

/// Number of points of the confidence grid used to pick the reported
/// precision/recall operating point.
const CONFIDENCE_GRID_POINTS: usize = 1000;

/// How the precision envelope is integrated over recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApMethod {
    /// 101-point interpolation, trapezoidal rule
    #[default]
    Interp,
    /// Exact area under every recall change
    Continuous,
}

/// Calculate Average Precision (AP) from one recall/precision curve.
///
/// The curve is padded with recall 0 in front and, at the end, with
/// `recall_last + 0.01` or, when `v5_metric` is set, with recall 1.0.
/// Precision is replaced by its envelope (running maximum from the right)
/// before integration.
///
/// # Example
///
/// ```
/// use multiattr_eval::metrics::ap::{compute_ap, ApMethod};
///
/// let ap = compute_ap(&[0.5, 1.0], &[1.0, 1.0], false, ApMethod::Interp);
/// assert!((ap - 1.0).abs() < 1e-10);
/// ```
pub fn compute_ap(recall: &[f64], precision: &[f64], v5_metric: bool, method: ApMethod) -> f64 {
    if recall.is_empty() || precision.is_empty() {
        return 0.0;
    }

    let last_recall = recall[recall.len() - 1];
    let mut mrec = Vec::with_capacity(recall.len() + 2);
    mrec.push(0.0);
    mrec.extend_from_slice(recall);
    mrec.push(if v5_metric { 1.0 } else { last_recall + 0.01 });

    let mut mpre = Vec::with_capacity(precision.len() + 2);
    mpre.push(1.0);
    mpre.extend_from_slice(precision);
    mpre.push(0.0);

    // Precision envelope
    for i in (0..mpre.len() - 1).rev() {
        mpre[i] = mpre[i].max(mpre[i + 1]);
    }

    match method {
        ApMethod::Interp => {
            let x = linspace(0.0, 1.0, 101);
            let left = mpre[0];
            let right = mpre[mpre.len() - 1];
            let y: Vec<f64> = x.iter().map(|&xi| interp(xi, &mrec, &mpre, left, right)).collect();
            trapezoid(&x, &y)
        }
        ApMethod::Continuous => mrec
            .windows(2)
            .zip(mpre.iter().skip(1))
            .filter(|(pair, _)| pair[1] != pair[0])
            .map(|(pair, &p)| (pair[1] - pair[0]) * p)
            .sum(),
    }
}

/// Trapezoidal integration of `y` over `x`.
fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

/// Calculate mean Average Precision (mAP) across multiple classes.
///
/// # Example
///
/// ```
/// use multiattr_eval::metrics::ap::calculate_map;
///
/// let class_aps = vec![0.8, 0.9, 0.75, 0.85];
/// let map = calculate_map(&class_aps);
/// assert!((map - 0.825).abs() < 1e-10);
/// ```
pub fn calculate_map(class_aps: &[f64]) -> f64 {
    if class_aps.is_empty() {
        return 0.0;
    }

    class_aps.iter().sum::<f64>() / class_aps.len() as f64
}

/// Compute per-class AP and the aggregated metrics of one attribute.
///
/// `correct`, `confidence` and `predicted_class` are parallel per-detection
/// arrays; `target_class` holds the class of every ground-truth instance.
/// Only classes present in `target_class` are evaluated; a present class
/// without detections gets AP 0. Precision and recall are reported at the
/// confidence that maximizes the mean F1 over classes.
pub fn ap_per_class(
    correct: &[CorrectnessRow],
    confidence: &[f64],
    predicted_class: &[usize],
    target_class: &[usize],
    num_classes: usize,
    v5_metric: bool,
    method: ApMethod,
) -> AttributeMetrics {
    let mut metrics = AttributeMetrics::empty(num_classes);
    for &class in target_class {
        if class >= metrics.targets_per_class.len() {
            metrics.targets_per_class.resize(class + 1, 0);
            metrics.ap_per_class.resize(class + 1, 0.0);
        }
        metrics.targets_per_class[class] += 1;
    }
    if target_class.is_empty() {
        return metrics;
    }

    // Ties on confidence are ordered by class and correctness so the result
    // does not depend on the order records were accumulated in
    let mut order: Vec<usize> = (0..confidence.len()).collect();
    order.sort_by(|&a, &b| {
        confidence[b]
            .total_cmp(&confidence[a])
            .then_with(|| predicted_class[a].cmp(&predicted_class[b]))
            .then_with(|| correct[b].cmp(&correct[a]))
    });

    let unique_classes: Vec<usize> = metrics
        .targets_per_class
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(class, _)| class)
        .collect();

    let grid = linspace(0.0, 1.0, CONFIDENCE_GRID_POINTS);
    let mut precision_curves = Vec::with_capacity(unique_classes.len());
    let mut recall_curves = Vec::with_capacity(unique_classes.len());
    let mut ap_rows = Vec::with_capacity(unique_classes.len());

    for &class in &unique_classes {
        let indices: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&i| predicted_class[i] == class)
            .collect();

        if indices.is_empty() {
            precision_curves.push(vec![0.0; CONFIDENCE_GRID_POINTS]);
            recall_curves.push(vec![0.0; CONFIDENCE_GRID_POINTS]);
            ap_rows.push([0.0; NUM_IOU_THRESHOLDS]);
            continue;
        }

        let rows: Vec<CorrectnessRow> = indices.iter().map(|&i| correct[i]).collect();
        let confidences: Vec<f64> = indices.iter().map(|&i| confidence[i]).collect();
        let curves = cumulative_curves(&rows, metrics.targets_per_class[class]);

        recall_curves.push(curve_over_confidence(&grid, &confidences, &curves.recall[0], 0.0));
        precision_curves.push(curve_over_confidence(&grid, &confidences, &curves.precision[0], 1.0));

        let mut ap_row = [0.0; NUM_IOU_THRESHOLDS];
        for (t, ap) in ap_row.iter_mut().enumerate() {
            *ap = compute_ap(&curves.recall[t], &curves.precision[t], v5_metric, method);
        }
        ap_rows.push(ap_row);
    }

    let best = best_mean_f1_index(&precision_curves, &recall_curves);

    for (ci, &class) in unique_classes.iter().enumerate() {
        let precision = precision_curves[ci][best];
        let recall = recall_curves[ci][best];
        let ap = calculate_map(&ap_rows[ci]);
        metrics.ap_per_class[class] = ap;
        metrics.classes.push(ClassMetrics {
            class_id: class,
            targets: metrics.targets_per_class[class],
            precision,
            recall,
            f1: calculate_f1_score(precision, recall),
            ap50: ap_rows[ci][0],
            ap,
        });
    }

    let mean_of = |f: fn(&ClassMetrics) -> f64| {
        calculate_map(&metrics.classes.iter().map(f).collect::<Vec<_>>())
    };
    let precision = mean_of(|c| c.precision);
    let recall = mean_of(|c| c.recall);
    let map50 = mean_of(|c| c.ap50);
    let map = mean_of(|c| c.ap);
    metrics.precision = precision;
    metrics.recall = recall;
    metrics.map50 = map50;
    metrics.map = map;

    metrics
}
