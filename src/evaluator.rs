//! Main evaluation orchestrator for multi-attribute detection metrics.

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EvalConfig;
use crate::error::{EvalError, Result};
use crate::metrics::ap::ap_per_class;
use crate::stats::EvalAccumulator;
use crate::types::{AttributeMetrics, CocoRecord, Detection, EvaluationReport, ImageInput};

/// Metrics returned by an external COCO-style scoring tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExternalScore {
    /// AP at IoU=0.50
    pub map50: f64,
    /// AP averaged over IoU=0.50:0.95
    pub map: f64,
}

/// Scores exported COCO records with an external tool.
pub trait ExternalScorer {
    /// Score the records of a finished run.
    ///
    /// # Errors
    ///
    /// Any failure of the tool; the evaluator logs it and keeps its own metrics.
    fn score(&self, records: &[CocoRecord]) -> Result<ExternalScore>;
}

/// Accumulates per-image statistics and computes per-attribute metrics.
///
/// # Example
///
/// ```
/// use multiattr_eval::config::EvalConfig;
/// use multiattr_eval::evaluator::Evaluator;
/// use multiattr_eval::types::{CandidateRow, GroundTruthLabel, ImageInput, ImageShape, ShapeInfo};
///
/// let mut evaluator = Evaluator::new(EvalConfig::with_class_counts(vec![2, 3])).unwrap();
/// let image = ImageInput {
///     rows: vec![CandidateRow::new(
///         [50.0, 50.0, 20.0, 20.0],
///         0.9,
///         vec![vec![0.0, 1.0], vec![1.0, 0.0, 0.0]],
///     )],
///     labels: vec![GroundTruthLabel::new(0, vec![1, 0], [0.5, 0.5, 0.2, 0.2])],
///     shape: ShapeInfo::identity(ImageShape::new(100.0, 100.0)),
///     stem: None,
/// };
/// evaluator.process_batch(&[image]).unwrap();
///
/// let report = evaluator.finalize();
/// assert!((report.attributes[0].map50 - 1.0).abs() < 1e-9);
/// assert!((report.attributes[1].map - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvalConfig,
    accumulator: EvalAccumulator,
}

impl Evaluator {
    /// Create an evaluator for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: EvalConfig) -> Result<Self> {
        config.validate()?;
        let accumulator = EvalAccumulator::new(&config);
        Ok(Self { config, accumulator })
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Statistics collected so far.
    pub fn accumulator(&self) -> &EvalAccumulator {
        &self.accumulator
    }

    /// Check that every image matches the configured attribute layout.
    ///
    /// # Errors
    ///
    /// Returns `AttributeMismatch` for wrong attribute or score vector counts,
    /// `InvalidLabel` for out-of-range classes and `InvalidBoundingBox` for
    /// unusable image shapes or label boxes.
    pub fn validate_batch(&self, images: &[ImageInput]) -> Result<()> {
        images
            .iter()
            .enumerate()
            .try_for_each(|(i, image)| validate_image(i, image, &self.config))
    }

    /// Process a single image.
    ///
    /// Returns the detections kept for the image, in original coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the image fails validation.
    pub fn process_image(&mut self, image: &ImageInput) -> Result<Vec<Detection>> {
        validate_image(0, image, &self.config)?;
        self.accumulator.process_image(image, &self.config)
    }

    /// Process a batch of images in parallel.
    ///
    /// The whole batch is validated before any image is processed, so a
    /// failed batch leaves the evaluator untouched. Returns the detections of
    /// every image in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if any image fails validation.
    pub fn process_batch(&mut self, images: &[ImageInput]) -> Result<Vec<Vec<Detection>>> {
        self.validate_batch(images)?;
        debug!("Processing batch of {} images", images.len());

        let config = &self.config;
        let (batch, mut outputs) = images
            .par_iter()
            .enumerate()
            .try_fold(
                || (EvalAccumulator::new(config), Vec::new()),
                |(mut acc, mut outputs), (index, image)| {
                    let detections = acc.process_image(image, config)?;
                    outputs.push((index, detections));
                    Ok::<_, EvalError>((acc, outputs))
                },
            )
            .try_reduce(
                || (EvalAccumulator::new(config), Vec::new()),
                |(acc, mut outputs), (other, other_outputs)| {
                    outputs.extend(other_outputs);
                    Ok((acc.merge(other), outputs))
                },
            )?;

        let accumulator = std::mem::replace(&mut self.accumulator, EvalAccumulator::new(&self.config));
        self.accumulator = accumulator.merge(batch);

        outputs.sort_by_key(|(index, _)| *index);
        Ok(outputs.into_iter().map(|(_, detections)| detections).collect())
    }

    /// Compute the final metrics of every attribute head.
    pub fn finalize(self) -> EvaluationReport {
        let Evaluator { config, accumulator } = self;
        info!("{}", accumulator.stats.summary_string());

        let attributes: Vec<AttributeMetrics> = accumulator
            .records
            .par_iter()
            .zip(config.class_counts.par_iter())
            .map(|(record, &num_classes)| {
                ap_per_class(
                    &record.correct,
                    &record.confidence,
                    &record.predicted_class,
                    &record.target_class,
                    num_classes,
                    config.v5_metric,
                    config.ap_method,
                )
            })
            .collect();

        for (k, metrics) in attributes.iter().enumerate() {
            info!(
                "att{}: labels={} P={:.3} R={:.3} mAP@.5={:.3} mAP@.5:.95={:.3}",
                k,
                metrics.total_targets(),
                metrics.precision,
                metrics.recall,
                metrics.map50,
                metrics.map
            );
        }

        EvaluationReport {
            images_seen: accumulator.stats.images_seen,
            attributes,
            confusion_matrices: accumulator.confusion,
            coco_records: accumulator.coco_records,
        }
    }

    /// Finalize and let an external tool rescore attribute 0.
    ///
    /// The tool only runs when COCO records were collected. On success the
    /// external AP values replace attribute 0's `map50` and `map`; on failure
    /// a warning is logged and the internal metrics are kept.
    pub fn finalize_with_scorer<S: ExternalScorer + ?Sized>(self, scorer: &S) -> EvaluationReport {
        let save_json = self.config.save_json;
        let mut report = self.finalize();
        if !save_json || report.coco_records.is_empty() {
            return report;
        }

        match scorer.score(&report.coco_records) {
            Ok(score) => {
                info!(
                    "External scorer: mAP@.5={:.3} mAP@.5:.95={:.3}",
                    score.map50, score.map
                );
                if let Some(primary) = report.attributes.first_mut() {
                    primary.map50 = score.map50;
                    primary.map = score.map;
                }
            }
            Err(e) => warn!("External scorer unable to run: {e}"),
        }
        report
    }
}

/// Check one image against the configured attribute layout.
fn validate_image(index: usize, image: &ImageInput, config: &EvalConfig) -> Result<()> {
    let n_att = config.n_att();

    for shape in [image.shape.inference, image.shape.original] {
        if !(shape.height > 0.0 && shape.width > 0.0) {
            return Err(EvalError::InvalidBoundingBox(format!(
                "image {}: non-positive image shape {}x{}",
                index, shape.height, shape.width
            )));
        }
    }

    for row in &image.rows {
        if row.class_scores.len() != n_att {
            return Err(EvalError::AttributeMismatch(format!(
                "image {}: candidate row has {} attribute heads, expected {}",
                index,
                row.class_scores.len(),
                n_att
            )));
        }
        for (k, (scores, &nc)) in row.class_scores.iter().zip(&config.class_counts).enumerate() {
            if scores.len() != nc {
                return Err(EvalError::AttributeMismatch(format!(
                    "image {}: attribute {} has {} class scores, expected {}",
                    index,
                    k,
                    scores.len(),
                    nc
                )));
            }
        }
    }

    for label in &image.labels {
        if label.attribute_classes.len() != n_att {
            return Err(EvalError::AttributeMismatch(format!(
                "image {}: label has {} attributes, expected {}",
                index,
                label.attribute_classes.len(),
                n_att
            )));
        }
        for (k, (&class, &nc)) in label.attribute_classes.iter().zip(&config.class_counts).enumerate() {
            if class >= nc {
                return Err(EvalError::InvalidLabel(format!(
                    "image {}: attribute {} class {} out of range 0..{}",
                    index, k, class, nc
                )));
            }
        }
        if label.bbox.iter().any(|v| !v.is_finite()) {
            return Err(EvalError::InvalidBoundingBox(format!(
                "image {}: non-finite label box {:?}",
                index, label.bbox
            )));
        }
    }

    Ok(())
}
