//! Statistics accumulated while images are processed.
//!
//! An [`EvalAccumulator`] owns everything a run collects before the final AP
//! pass: one [`StatsRecord`] and one [`ConfusionMatrix`] per attribute head,
//! image counters and, optionally, COCO result records. Accumulators built on
//! different threads are combined with [`EvalAccumulator::merge`].

use serde::{Deserialize, Serialize};

use crate::config::EvalConfig;
use crate::confusion::ConfusionMatrix;
use crate::error::Result;
use crate::export::coco_records;
use crate::geometry::{denormalize_xywh, scale_coords, xywh_to_xyxy};
use crate::matching::correctness_matrix;
use crate::nms::non_max_suppression_multi_attr;
use crate::threshold::iou_vector;
use crate::types::{BBoxXYWH, BBoxXYXY, CocoRecord, CorrectnessRow, Detection, ImageInput, ShapeInfo};

/// Matching records of one attribute head.
///
/// `correct`, `confidence` and `predicted_class` are parallel, one entry per
/// detection; `target_class` holds one entry per ground-truth instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub correct: Vec<CorrectnessRow>,
    pub confidence: Vec<f64>,
    pub predicted_class: Vec<usize>,
    pub target_class: Vec<usize>,
}

impl StatsRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every entry of `other`.
    pub fn extend(&mut self, other: StatsRecord) {
        self.correct.extend(other.correct);
        self.confidence.extend(other.confidence);
        self.predicted_class.extend(other.predicted_class);
        self.target_class.extend(other.target_class);
    }

    pub fn num_detections(&self) -> usize {
        self.confidence.len()
    }

    pub fn num_targets(&self) -> usize {
        self.target_class.len()
    }
}

/// Counters collected while processing images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStats {
    /// Total number of images processed
    pub images_seen: usize,

    /// Number of ground-truth instances seen
    pub labels_seen: usize,

    /// Number of detections kept by `NMS`
    pub detections_kept: usize,

    /// Number of images with zero detections after `NMS`
    pub images_without_detections: usize,

    /// Number of images with zero ground-truth instances
    pub images_without_labels: usize,
}

impl ImageStats {
    /// Create a new `ImageStats` with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the counters of `other`.
    pub fn merge(&mut self, other: &ImageStats) {
        self.images_seen += other.images_seen;
        self.labels_seen += other.labels_seen;
        self.detections_kept += other.detections_kept;
        self.images_without_detections += other.images_without_detections;
        self.images_without_labels += other.images_without_labels;
    }

    /// Get a formatted string summary of the statistics
    pub fn summary_string(&self) -> String {
        format!(
            "ImageStats {{ images: {}, labels: {}, detections: {}, no_detections: {}, no_labels: {} }}",
            self.images_seen,
            self.labels_seen,
            self.detections_kept,
            self.images_without_detections,
            self.images_without_labels
        )
    }
}

/// Everything collected for a run before the AP pass.
#[derive(Debug, Clone)]
pub struct EvalAccumulator {
    pub records: Vec<StatsRecord>,
    pub confusion: Vec<ConfusionMatrix>,
    pub stats: ImageStats,
    pub coco_records: Vec<CocoRecord>,
}

impl EvalAccumulator {
    /// Empty accumulator with one record and one matrix per attribute head.
    pub fn new(config: &EvalConfig) -> Self {
        Self {
            records: vec![StatsRecord::new(); config.n_att()],
            confusion: config
                .class_counts
                .iter()
                .map(|&nc| {
                    ConfusionMatrix::with_thresholds(nc, config.confusion_conf, config.confusion_iou)
                })
                .collect(),
            stats: ImageStats::new(),
            coco_records: Vec::new(),
        }
    }

    /// Run `NMS`, matching and accumulation for one image.
    ///
    /// Inputs must match the attribute layout of `config`; the evaluator
    /// validates every image before calling. Returns the kept detections in
    /// original image coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the `NMS` parameters of `config` are invalid.
    pub(crate) fn process_image(&mut self, image: &ImageInput, config: &EvalConfig) -> Result<Vec<Detection>> {
        let hybrid_labels: Vec<Detection> = if config.hybrid {
            image
                .labels
                .iter()
                .map(|label| {
                    let bbox = xywh_to_xyxy(denormalize_xywh(label.bbox, image.shape.inference));
                    Detection::new(bbox, 1.0, label.attribute_classes.clone())
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut detections =
            non_max_suppression_multi_attr(&image.rows, &config.nms_params(), &hybrid_labels)?;
        for detection in &mut detections {
            detection.bbox = scale_coords(detection.bbox, &image.shape);
        }

        let gt_boxes: Vec<BBoxXYXY> = image
            .labels
            .iter()
            .map(|label| label_box(label.bbox, &image.shape))
            .collect();

        self.stats.images_seen += 1;
        self.stats.labels_seen += image.labels.len();
        self.stats.detections_kept += detections.len();
        if image.labels.is_empty() {
            self.stats.images_without_labels += 1;
        }

        if config.save_json {
            if let Some(stem) = &image.stem {
                self.coco_records
                    .extend(coco_records(&detections, stem, config.is_coco));
            }
        }

        let det_boxes: Vec<BBoxXYXY> = detections.iter().map(|d| d.bbox).collect();
        let det_confidences: Vec<f64> = detections.iter().map(|d| d.confidence).collect();

        if detections.is_empty() {
            self.stats.images_without_detections += 1;
            if image.labels.is_empty() {
                return Ok(detections);
            }
            for (k, (record, matrix)) in self.records.iter_mut().zip(&mut self.confusion).enumerate() {
                let targets: Vec<usize> = image.labels.iter().map(|l| l.attribute_classes[k]).collect();
                matrix.process_batch(&[], &[], &[], &gt_boxes, &targets);
                record.target_class.extend(targets);
            }
            return Ok(detections);
        }

        let det_primary: Vec<usize> = detections.iter().map(Detection::primary_class).collect();
        let gt_primary: Vec<usize> = image.labels.iter().map(|l| l.primary_class()).collect();
        let correct = correctness_matrix(
            &det_boxes,
            &det_confidences,
            &det_primary,
            &gt_boxes,
            &gt_primary,
            &iou_vector(),
        );

        for (k, (record, matrix)) in self.records.iter_mut().zip(&mut self.confusion).enumerate() {
            let predicted: Vec<usize> = detections.iter().map(|d| d.attribute_classes[k]).collect();
            let targets: Vec<usize> = image.labels.iter().map(|l| l.attribute_classes[k]).collect();
            matrix.process_batch(&det_boxes, &det_confidences, &predicted, &gt_boxes, &targets);

            record.extend(StatsRecord {
                correct: correct.clone(),
                confidence: det_confidences.clone(),
                predicted_class: predicted,
                target_class: targets,
            });
        }

        Ok(detections)
    }

    /// Combine two accumulators of the same run.
    ///
    /// Records of `other` are appended after those of `self`; matrices and
    /// counters are summed.
    pub fn merge(mut self, other: EvalAccumulator) -> Self {
        for (record, other_record) in self.records.iter_mut().zip(other.records) {
            record.extend(other_record);
        }
        for (matrix, other_matrix) in self.confusion.iter_mut().zip(&other.confusion) {
            matrix.merge(other_matrix);
        }
        self.stats.merge(&other.stats);
        self.coco_records.extend(other.coco_records);
        self
    }
}

/// Ground-truth box in original image pixels.
fn label_box(bbox: BBoxXYWH, shape: &ShapeInfo) -> BBoxXYXY {
    scale_coords(xywh_to_xyxy(denormalize_xywh(bbox, shape.inference)), shape)
}
