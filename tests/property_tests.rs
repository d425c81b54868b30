//! Property-based tests using proptest
//!
//! These tests verify mathematical properties and invariants that should
//! always hold regardless of the input values.

use multiattr_eval::confusion::ConfusionMatrix;
use multiattr_eval::geometry::{xywh_to_xyxy, xyxy_to_xywh};
use multiattr_eval::matching::correctness_matrix;
use multiattr_eval::metrics::ap::{ap_per_class, compute_ap, ApMethod};
use multiattr_eval::metrics::f1_score::calculate_f1_score;
use multiattr_eval::metrics::iou::box_iou;
use multiattr_eval::metrics::precision_recall::calculate_precision_recall;
use multiattr_eval::nms::{non_max_suppression_multi_attr, NmsParams};
use multiattr_eval::threshold::iou_vector;
use multiattr_eval::types::{CandidateRow, CorrectnessRow};
use proptest::prelude::*;

fn box_strategy() -> impl Strategy<Value = [f64; 4]> {
    (0.0f64..200.0, 0.0f64..200.0, 5.0f64..60.0, 5.0f64..60.0)
        .prop_map(|(x, y, w, h)| [x, y, x + w, y + h])
}

fn row_strategy() -> impl Strategy<Value = CandidateRow> {
    (0.0f64..200.0, 0.0f64..200.0, 5.0f64..60.0, 5.0f64..60.0, 0.01f64..1.0, 0usize..3, 0usize..2)
        .prop_map(|(x, y, w, h, obj, c0, c1)| {
            let mut att0 = vec![0.1; 3];
            att0[c0] = 0.9;
            let mut att1 = vec![0.2; 2];
            att1[c1] = 0.8;
            CandidateRow::new([x, y, w, h], obj, vec![att0, att1])
        })
}

fn reversed<T: Clone>(values: &[T]) -> Vec<T> {
    values.iter().rev().cloned().collect()
}

// Property: Precision and recall should always be between 0.0 and 1.0
proptest! {
    #[test]
    fn prop_precision_recall_range(tp in 0usize..1000, fp in 0usize..1000, fn_ in 0usize..1000) {
        let pr = calculate_precision_recall(tp, fp, fn_);
        assert!(pr.precision >= 0.0 && pr.precision <= 1.0,
                "Precision should be in [0,1], got {}", pr.precision);
        assert!(pr.recall >= 0.0 && pr.recall <= 1.0,
                "Recall should be in [0,1], got {}", pr.recall);
    }
}

// Property: F1 is the harmonic mean of precision and recall
proptest! {
    #[test]
    fn prop_f1_harmonic_mean(
        precision in 0.0f64..=1.0,
        recall in 0.0f64..=1.0
    ) {
        let f1 = calculate_f1_score(precision, recall);

        if precision + recall > 0.0 {
            let expected = 2.0 * precision * recall / (precision + recall);
            assert!((f1 - expected).abs() < 1e-10,
                    "F1 should be harmonic mean: expected {}, got {}", expected, f1);
        } else {
            assert_eq!(f1, 0.0, "F1 should be 0 when both P and R are 0");
        }
    }
}

// Property: IoU is symmetric and bounded
proptest! {
    #[test]
    fn prop_iou_symmetric_and_bounded(a in box_strategy(), b in box_strategy()) {
        let iou1 = box_iou(&a, &b);
        let iou2 = box_iou(&b, &a);

        assert!((iou1 - iou2).abs() < 1e-10,
                "IoU should be symmetric: {} vs {}", iou1, iou2);
        assert!(iou1 >= 0.0 && iou1 <= 1.0,
                "IoU should be in [0,1], got {}", iou1);
    }
}

// Property: Identical boxes have IoU = 1.0
proptest! {
    #[test]
    fn prop_iou_identical(bbox in box_strategy()) {
        let iou = box_iou(&bbox, &bbox);

        assert!((iou - 1.0).abs() < 1e-10,
                "Identical boxes should have IoU=1.0, got {}", iou);
    }
}

// Property: Disjoint boxes have IoU = 0.0
proptest! {
    #[test]
    fn prop_iou_disjoint(bbox in box_strategy(), gap in 0.0f64..50.0) {
        let shifted = [bbox[2] + gap, bbox[1], bbox[2] + gap + 10.0, bbox[3]];
        assert_eq!(box_iou(&bbox, &shifted), 0.0);
    }
}

// Property: Bounding box conversion roundtrip
proptest! {
    #[test]
    fn prop_bbox_conversion_roundtrip(bbox in box_strategy()) {
        let back = xywh_to_xyxy(xyxy_to_xywh(bbox));

        for i in 0..4 {
            assert!((bbox[i] - back[i]).abs() < 1e-9,
                    "Roundtrip conversion failed at index {}: {} vs {}", i, bbox[i], back[i]);
        }
    }
}

// Property: NMS never keeps two same-class boxes above the IoU threshold
proptest! {
    #[test]
    fn prop_nms_suppresses_same_class_overlaps(
        rows in prop::collection::vec(row_strategy(), 0..60),
        iou_thres in 0.1f64..0.9,
    ) {
        let params = NmsParams { iou_thres, ..NmsParams::default() };
        let kept = non_max_suppression_multi_attr(&rows, &params, &[]).unwrap();

        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                if kept[i].primary_class() == kept[j].primary_class() {
                    let iou = box_iou(&kept[i].bbox, &kept[j].bbox);
                    assert!(iou <= iou_thres + 1e-9,
                            "Kept same-class pair with IoU {} > {}", iou, iou_thres);
                }
            }
        }
        for pair in kept.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence, "Output should be sorted by confidence");
        }
    }
}

// Property: NMS respects max_det
proptest! {
    #[test]
    fn prop_nms_respects_max_det(
        rows in prop::collection::vec(row_strategy(), 0..80),
        max_det in 1usize..20,
    ) {
        let params = NmsParams { max_det, agnostic: true, iou_thres: 0.9, ..NmsParams::default() };
        let kept = non_max_suppression_multi_attr(&rows, &params, &[]).unwrap();
        assert!(kept.len() <= max_det);
        assert!(kept.iter().all(|d| d.attribute_classes.len() == 2));
    }
}

// Property: Each label is claimed by at most one detection
proptest! {
    #[test]
    fn prop_matching_claims_each_label_once(
        dets in prop::collection::vec((box_strategy(), 0.01f64..1.0, 0usize..2), 0..30),
        gts in prop::collection::vec((box_strategy(), 0usize..2), 0..10),
    ) {
        let det_boxes: Vec<[f64; 4]> = dets.iter().map(|d| d.0).collect();
        let det_conf: Vec<f64> = dets.iter().map(|d| d.1).collect();
        let det_cls: Vec<usize> = dets.iter().map(|d| d.2).collect();
        let gt_boxes: Vec<[f64; 4]> = gts.iter().map(|g| g.0).collect();
        let gt_cls: Vec<usize> = gts.iter().map(|g| g.1).collect();

        let correct = correctness_matrix(&det_boxes, &det_conf, &det_cls, &gt_boxes, &gt_cls, &iou_vector());
        assert_eq!(correct.len(), dets.len());

        for t in 0..10 {
            let hits = correct.iter().filter(|row| row[t]).count();
            assert!(hits <= gts.len(), "More true positives than labels at threshold {}", t);
        }
        // Correctness is monotone over thresholds
        for row in &correct {
            for t in 1..10 {
                assert!(row[t - 1] || !row[t]);
            }
        }
    }
}

// Property: Confusion total = labels + unmatched confident detections
proptest! {
    #[test]
    fn prop_confusion_total(
        dets in prop::collection::vec((box_strategy(), 0.01f64..1.0, 0usize..3), 0..20),
        gts in prop::collection::vec((box_strategy(), 0usize..3), 0..10),
    ) {
        let det_boxes: Vec<[f64; 4]> = dets.iter().map(|d| d.0).collect();
        let det_conf: Vec<f64> = dets.iter().map(|d| d.1).collect();
        let det_cls: Vec<usize> = dets.iter().map(|d| d.2).collect();
        let gt_boxes: Vec<[f64; 4]> = gts.iter().map(|g| g.0).collect();
        let gt_cls: Vec<usize> = gts.iter().map(|g| g.1).collect();

        let mut matrix = ConfusionMatrix::new(3);
        matrix.process_batch(&det_boxes, &det_conf, &det_cls, &gt_boxes, &gt_cls);

        let confident = det_conf.iter().filter(|&&c| c > 0.25).count() as u64;
        let missed: u64 = (0..3).map(|t| matrix.get(3, t)).sum();
        let matched = gts.len() as u64 - missed;
        assert_eq!(matrix.total(), gts.len() as u64 + confident - matched);

        let label_columns: u64 = (0..=3).flat_map(|p| (0..3).map(move |t| (p, t))).map(|(p, t)| matrix.get(p, t)).sum();
        assert_eq!(label_columns, gts.len() as u64);
    }
}

// Property: AP is within [0, 1] and independent of record order
proptest! {
    #[test]
    fn prop_ap_bounded_and_order_independent(
        rows in prop::collection::vec((any::<bool>(), 0usize..3), 1..50),
        targets in prop::collection::vec(0usize..3, 1..30),
        v5_metric in any::<bool>(),
    ) {
        let n = rows.len();
        let correct: Vec<CorrectnessRow> = rows.iter().map(|r| [r.0; 10]).collect();
        let confidence: Vec<f64> = (0..n).map(|i| (i + 1) as f64 / (n + 1) as f64).collect();
        let predicted: Vec<usize> = rows.iter().map(|r| r.1).collect();

        let forward = ap_per_class(&correct, &confidence, &predicted, &targets, 3, v5_metric, ApMethod::Interp);

        let backward = ap_per_class(
            &reversed(&correct),
            &reversed(&confidence),
            &reversed(&predicted),
            &reversed(&targets),
            3,
            v5_metric,
            ApMethod::Interp,
        );

        assert!(forward.map >= 0.0 && forward.map <= 1.0 + 1e-9);
        assert!(forward.map50 >= forward.map - 1e-12);
        assert!((forward.map - backward.map).abs() < 1e-12);
        assert_eq!(forward.ap_per_class, backward.ap_per_class);
    }
}

// Property: Continuous AP is bounded by the final recall
proptest! {
    #[test]
    fn prop_continuous_ap_bounded(hits in prop::collection::vec(any::<bool>(), 1..40)) {
        let labels = hits.len();
        let mut tp = 0.0;
        let mut recall = Vec::new();
        let mut precision = Vec::new();
        for (i, &hit) in hits.iter().enumerate() {
            if hit {
                tp += 1.0;
            }
            recall.push(tp / labels as f64);
            precision.push(tp / (i + 1) as f64);
        }
        let ap = compute_ap(&recall, &precision, false, ApMethod::Continuous);
        assert!(ap >= 0.0 && ap <= recall[labels - 1] + 1e-12);
    }
}

// Property: AP ignores record order even when confidences tie
proptest! {
    #[test]
    fn prop_ap_order_independent_with_ties(
        rows in prop::collection::vec((any::<bool>(), 0usize..3, 0usize..4), 1..50),
        targets in prop::collection::vec(0usize..3, 1..30),
    ) {
        let correct: Vec<CorrectnessRow> = rows.iter().map(|r| [r.0; 10]).collect();
        let confidence: Vec<f64> = rows.iter().map(|r| 0.25 * (r.2 + 1) as f64).collect();
        let predicted: Vec<usize> = rows.iter().map(|r| r.1).collect();

        let forward = ap_per_class(&correct, &confidence, &predicted, &targets, 3, false, ApMethod::Interp);
        let backward = ap_per_class(
            &reversed(&correct),
            &reversed(&confidence),
            &reversed(&predicted),
            &targets,
            3,
            false,
            ApMethod::Interp,
        );

        assert_eq!(forward, backward);
    }
}
