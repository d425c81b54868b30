//! Comprehensive edge case and boundary condition tests.

use multiattr_eval::config::EvalConfig;
use multiattr_eval::confusion::ConfusionMatrix;
use multiattr_eval::evaluator::Evaluator;
use multiattr_eval::geometry::{scale_coords, xywh_to_xyxy, xyxy_to_xywh};
use multiattr_eval::matching::correctness_matrix;
use multiattr_eval::metrics::ap::{ap_per_class, compute_ap, ApMethod};
use multiattr_eval::metrics::iou::{box_iou, box_iou_matrix};
use multiattr_eval::nms::{non_max_suppression_multi_attr, suppress, NmsParams};
use multiattr_eval::threshold::iou_vector;
use multiattr_eval::types::{
    CandidateRow, Detection, GroundTruthLabel, ImageInput, ImageShape, Letterbox, ShapeInfo,
};

fn create_image(rows: Vec<CandidateRow>, labels: Vec<GroundTruthLabel>) -> ImageInput {
    ImageInput {
        rows,
        labels,
        shape: ShapeInfo::identity(ImageShape::new(100.0, 100.0)),
        stem: None,
    }
}

// ============================================================================
// GEOMETRY EDGE CASES
// ============================================================================

#[test]
fn test_zero_area_boxes() {
    let point = [5.0, 5.0, 5.0, 5.0];
    assert_eq!(box_iou(&point, &point), 0.0, "Degenerate boxes should give IoU 0, not NaN");
    assert_eq!(box_iou(&point, &[0.0, 0.0, 10.0, 10.0]), 0.0);
}

#[test]
fn test_touching_boxes() {
    let a = [0.0, 0.0, 10.0, 10.0];
    let b = [10.0, 0.0, 20.0, 10.0];
    assert_eq!(box_iou(&a, &b), 0.0, "Edge-sharing boxes have no intersection area");
}

#[test]
fn test_iou_matrix_empty_sides() {
    let boxes = vec![[0.0, 0.0, 1.0, 1.0]];
    assert!(box_iou_matrix(&[], &boxes).is_empty());
    let matrix = box_iou_matrix(&boxes, &[]);
    assert_eq!(matrix.len(), 1);
    assert!(matrix[0].is_empty());
}

#[test]
fn test_conversion_with_fractional_values() {
    let xyxy = [0.1, 0.2, 0.7, 0.9];
    let back = xywh_to_xyxy(xyxy_to_xywh(xyxy));
    for (a, b) in xyxy.iter().zip(&back) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn test_scale_coords_clips_to_original() {
    let shape = ShapeInfo {
        inference: ImageShape::new(640.0, 640.0),
        original: ImageShape::new(640.0, 1280.0),
        letterbox: None,
    };
    // Box partly inside the top padding band
    let scaled = scale_coords([-20.0, 100.0, 700.0, 300.0], &shape);
    assert_eq!(scaled, [0.0, 0.0, 1280.0, 280.0]);
}

#[test]
fn test_scale_coords_explicit_ratio_pad() {
    let shape = ShapeInfo {
        inference: ImageShape::new(640.0, 640.0),
        original: ImageShape::new(480.0, 640.0),
        letterbox: Some(Letterbox { gain: 1.0, pad: (0.0, 80.0) }),
    };
    let scaled = scale_coords([10.0, 90.0, 20.0, 100.0], &shape);
    assert_eq!(scaled, [10.0, 10.0, 20.0, 20.0]);
}

// ============================================================================
// NMS EDGE CASES
// ============================================================================

#[test]
fn test_nms_all_below_threshold() {
    let rows = vec![CandidateRow::new([10.0, 10.0, 5.0, 5.0], 0.0005, vec![vec![1.0]])];
    let kept = non_max_suppression_multi_attr(&rows, &NmsParams::default(), &[]).unwrap();
    assert!(kept.is_empty());
}

#[test]
fn test_nms_identical_boxes_keep_first() {
    let detections = vec![
        Detection::new([0.0, 0.0, 10.0, 10.0], 0.5, vec![0]),
        Detection::new([0.0, 0.0, 10.0, 10.0], 0.5, vec![0]),
    ];
    let mut second = detections[1].clone();
    second.attribute_scores = vec![0.25];
    let kept = suppress(vec![detections[0].clone(), second], &NmsParams::default());
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].attribute_scores, vec![0.5], "Equal confidences keep input order");
}

#[test]
fn test_nms_max_nms_cap() {
    let detections: Vec<Detection> = (0..50)
        .map(|i| Detection::new([i as f64 * 20.0, 0.0, i as f64 * 20.0 + 10.0, 10.0], 0.9 - i as f64 * 0.01, vec![0]))
        .collect();
    let params = NmsParams {
        max_nms: 10,
        ..NmsParams::default()
    };
    assert_eq!(suppress(detections, &params).len(), 10);
}

// ============================================================================
// MATCHING EDGE CASES
// ============================================================================

#[test]
fn test_more_detections_than_labels() {
    let gt = vec![[0.0, 0.0, 10.0, 10.0]];
    let det = vec![[0.0, 0.0, 10.0, 10.0], [1.0, 1.0, 10.0, 10.0], [50.0, 50.0, 60.0, 60.0]];
    let correct = correctness_matrix(&det, &[0.9, 0.8, 0.7], &[0, 0, 0], &gt, &[0], &iou_vector());
    assert_eq!(correct.iter().filter(|row| row[0]).count(), 1);
    assert!(correct[0][0]);
}

#[test]
fn test_duplicate_claim_stays_false() {
    // Both detections see the same best label; the second one stays incorrect
    // even though a second, worse-overlapping label exists.
    let gt = vec![[0.0, 0.0, 10.0, 10.0], [0.0, 3.0, 10.0, 13.0]];
    let det = vec![[0.0, 0.0, 10.0, 10.0], [0.0, 0.5, 10.0, 10.5]];
    let correct = correctness_matrix(&det, &[0.9, 0.8], &[0, 0], &gt, &[0, 0], &iou_vector());
    assert!(correct[0][0]);
    assert!(!correct[1][0]);
}

// ============================================================================
// AP EDGE CASES
// ============================================================================

#[test]
fn test_ap_only_false_positives() {
    let metrics = ap_per_class(&[[false; 10]; 3], &[0.9, 0.8, 0.7], &[0, 0, 0], &[0], 1, false, ApMethod::Interp);
    assert_eq!(metrics.map, 0.0);
    assert_eq!(metrics.precision, 0.0);
}

#[test]
fn test_ap_predictions_only_for_absent_class() {
    let metrics = ap_per_class(&[[true; 10]], &[0.9], &[1], &[0], 2, false, ApMethod::Interp);
    assert_eq!(metrics.classes.len(), 1, "Only classes with instances are reported");
    assert_eq!(metrics.ap_per_class, vec![0.0, 0.0]);
}

#[test]
fn test_continuous_vs_interp_close() {
    let recall = [0.2, 0.4, 0.4, 0.6, 0.8];
    let precision = [1.0, 1.0, 0.67, 0.75, 0.8];
    let interp = compute_ap(&recall, &precision, false, ApMethod::Interp);
    let continuous = compute_ap(&recall, &precision, false, ApMethod::Continuous);
    assert!((interp - continuous).abs() < 0.02);
}

// ============================================================================
// PIPELINE EDGE CASES
// ============================================================================

#[test]
fn test_empty_run() {
    let evaluator = Evaluator::new(EvalConfig::with_class_counts(vec![4, 2])).unwrap();
    let report = evaluator.finalize();
    assert_eq!(report.images_seen, 0);
    assert!(report.attributes.iter().all(|a| a.map == 0.0 && a.ap_per_class.len() > 1));
}

#[test]
fn test_images_without_labels_or_detections() {
    let mut evaluator = Evaluator::new(EvalConfig::with_class_counts(vec![1])).unwrap();
    evaluator
        .process_batch(&[create_image(vec![], vec![]), create_image(vec![], vec![])])
        .unwrap();
    let stats = evaluator.accumulator().stats;
    assert_eq!(stats.images_seen, 2);
    assert_eq!(stats.images_without_detections, 2);
    let report = evaluator.finalize();
    assert_eq!(report.confusion_matrices[0].total(), 0);
}

#[test]
fn test_hybrid_labels_become_detections() {
    let config = EvalConfig {
        hybrid: true,
        ..EvalConfig::with_class_counts(vec![2])
    };
    let mut evaluator = Evaluator::new(config).unwrap();
    let image = create_image(vec![], vec![GroundTruthLabel::new(0, vec![1], [0.5, 0.5, 0.2, 0.2])]);
    let detections = evaluator.process_image(&image).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].confidence, 1.0);
    assert_eq!(detections[0].bbox, [40.0, 40.0, 60.0, 60.0]);

    let report = evaluator.finalize();
    assert!((report.attributes[0].map - 1.0).abs() < 1e-9);
}

#[test]
fn test_v5_metric_lowers_perfect_ap() {
    let config = EvalConfig {
        v5_metric: true,
        ..EvalConfig::with_class_counts(vec![1])
    };
    let mut evaluator = Evaluator::new(config).unwrap();
    let image = create_image(
        vec![CandidateRow::new([50.0, 50.0, 20.0, 20.0], 0.9, vec![vec![1.0]])],
        vec![GroundTruthLabel::new(0, vec![0], [0.5, 0.5, 0.2, 0.2])],
    );
    evaluator.process_image(&image).unwrap();
    let report = evaluator.finalize();
    assert!((report.attributes[0].map50 - 0.995).abs() < 1e-9);
}

#[test]
fn test_confusion_merge_of_empty() {
    let mut a = ConfusionMatrix::new(3);
    let b = ConfusionMatrix::new(3);
    a.merge(&b);
    assert_eq!(a.total(), 0);
    assert_eq!(a.matrix().len(), 4);
}
