//! Core data types for multi-attribute detections, labels and metrics.

use serde::{Deserialize, Serialize};

use crate::confusion::ConfusionMatrix;
use crate::export::format_general;
use crate::threshold::NUM_IOU_THRESHOLDS;

/// Bounding box in [x_center, y_center, width, height] format
pub type BBoxXYWH = [f64; 4];

/// Bounding box in [x1, y1, x2, y2] format
pub type BBoxXYXY = [f64; 4];

/// One correctness row: `true` at every IoU threshold the detection satisfied.
pub type CorrectnessRow = [bool; NUM_IOU_THRESHOLDS];

/// A raw network output row, before NMS.
///
/// `class_scores[k]` holds the score vector of attribute head `k`. All heads
/// describe the same box and share `objectness`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRow {
    /// Box in inference-frame pixels, center format
    pub bbox: BBoxXYWH,
    pub objectness: f64,
    pub class_scores: Vec<Vec<f64>>,
}

impl CandidateRow {
    /// Create a new candidate row.
    pub fn new(bbox: BBoxXYWH, objectness: f64, class_scores: Vec<Vec<f64>>) -> Self {
        Self {
            bbox,
            objectness,
            class_scores,
        }
    }
}

/// A detection kept by NMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box in XYXY format
    pub bbox: BBoxXYXY,
    /// Attribute-0 fused score, used for ranking
    pub confidence: f64,
    /// Arg-max class per attribute head
    pub attribute_classes: Vec<usize>,
    /// Fused score (objectness x class score) per attribute head
    pub attribute_scores: Vec<f64>,
}

impl Detection {
    /// Create a detection whose attribute scores all equal `confidence`.
    pub fn new(bbox: BBoxXYXY, confidence: f64, attribute_classes: Vec<usize>) -> Self {
        let attribute_scores = vec![confidence; attribute_classes.len()];
        Self {
            bbox,
            confidence,
            attribute_classes,
            attribute_scores,
        }
    }

    /// Class of the primary attribute (index 0).
    pub fn primary_class(&self) -> usize {
        self.attribute_classes.first().copied().unwrap_or(0)
    }
}

/// Ground-truth object of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthLabel {
    pub image_index: usize,
    pub attribute_classes: Vec<usize>,
    /// Normalized center box, relative to the inference frame
    pub bbox: BBoxXYWH,
}

impl GroundTruthLabel {
    /// Create a new label.
    pub fn new(image_index: usize, attribute_classes: Vec<usize>, bbox: BBoxXYWH) -> Self {
        Self {
            image_index,
            attribute_classes,
            bbox,
        }
    }

    /// Class of the primary attribute (index 0).
    pub fn primary_class(&self) -> usize {
        self.attribute_classes.first().copied().unwrap_or(0)
    }
}

/// Image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: f64,
    pub width: f64,
}

impl ImageShape {
    /// Create a new image shape.
    pub fn new(height: f64, width: f64) -> Self {
        Self { height, width }
    }
}

/// Resize gain and padding applied by the letterbox preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Letterbox {
    pub gain: f64,
    /// Padding as (x, y)
    pub pad: (f64, f64),
}

/// Geometry needed to map inference-frame boxes back to the original image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeInfo {
    pub inference: ImageShape,
    pub original: ImageShape,
    /// When `None`, gain and centered padding are derived from the shapes
    #[serde(default)]
    pub letterbox: Option<Letterbox>,
}

impl ShapeInfo {
    /// Shape info for an image evaluated at its native resolution.
    pub fn identity(shape: ImageShape) -> Self {
        Self {
            inference: shape,
            original: shape,
            letterbox: Some(Letterbox {
                gain: 1.0,
                pad: (0.0, 0.0),
            }),
        }
    }
}

/// Everything the evaluator needs for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInput {
    pub rows: Vec<CandidateRow>,
    pub labels: Vec<GroundTruthLabel>,
    pub shape: ShapeInfo,
    /// File stem of the image, used as the COCO image id
    #[serde(default)]
    pub stem: Option<String>,
}

/// Metrics of one class of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class_id: usize,
    /// Number of ground-truth instances
    pub targets: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// AP at IoU=0.50
    pub ap50: f64,
    /// AP averaged over IoU=0.50:0.95
    pub ap: f64,
}

/// Evaluation metrics of one attribute head.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeMetrics {
    pub precision: f64,
    pub recall: f64,
    /// Mean AP at IoU=0.50
    pub map50: f64,
    /// Mean AP at IoU=0.50:0.95
    pub map: f64,
    /// AP@0.5:0.95 per class id; classes without instances hold 0.0
    pub ap_per_class: Vec<f64>,
    /// Instance count per class id
    pub targets_per_class: Vec<usize>,
    /// Classes present in the ground truth, ascending
    pub classes: Vec<ClassMetrics>,
}

impl AttributeMetrics {
    /// Zeroed metrics for an attribute with `num_classes` classes.
    pub fn empty(num_classes: usize) -> Self {
        Self {
            ap_per_class: vec![0.0; num_classes],
            targets_per_class: vec![0; num_classes],
            ..Self::default()
        }
    }

    /// Total ground-truth instances.
    pub fn total_targets(&self) -> usize {
        self.targets_per_class.iter().sum()
    }
}

/// Final result of an evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub images_seen: usize,
    pub attributes: Vec<AttributeMetrics>,
    pub confusion_matrices: Vec<ConfusionMatrix>,
    /// COCO result records, collected when `save_json` is set
    pub coco_records: Vec<CocoRecord>,
}

impl EvaluationReport {
    /// Number of attribute heads.
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    /// Results table, one block per attribute, metrics printed as `%12.3g`.
    ///
    /// The first line of a block is the `all` row; per-class rows follow when
    /// the attribute has more than one class.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{:>20}{:>12}{:>12}{:>12}{:>12}{:>12}{:>12}",
            "Class", "Images", "Labels", "P", "R", "mAP@.5", "mAP@.5:.95"
        )];
        for (k, metrics) in self.attributes.iter().enumerate() {
            lines.push(format!(
                "{:>20}{:>12}{:>12}{:>12}{:>12}{:>12}{:>12}",
                format!("att{k}/all"),
                self.images_seen,
                metrics.total_targets(),
                format_general(metrics.precision, 3),
                format_general(metrics.recall, 3),
                format_general(metrics.map50, 3),
                format_general(metrics.map, 3)
            ));
            if metrics.ap_per_class.len() > 1 {
                for class in &metrics.classes {
                    lines.push(format!(
                        "{:>20}{:>12}{:>12}{:>12}{:>12}{:>12}{:>12}",
                        format!("att{k}/{}", class.class_id),
                        self.images_seen,
                        class.targets,
                        format_general(class.precision, 3),
                        format_general(class.recall, 3),
                        format_general(class.ap50, 3),
                        format_general(class.ap, 3)
                    ));
                }
            }
        }
        lines
    }
}

/// Image identifier in COCO records: numeric when the file stem is numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageId {
    Numeric(u64),
    Name(String),
}

impl ImageId {
    /// Build an id from an image file stem.
    pub fn from_stem(stem: &str) -> Self {
        if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(id) = stem.parse() {
                return ImageId::Numeric(id);
            }
        }
        ImageId::Name(stem.to_string())
    }
}

/// One prediction in COCO results format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoRecord {
    pub image_id: ImageId,
    pub category_id: u64,
    /// [x_top_left, y_top_left, width, height] in original image pixels
    pub bbox: [f64; 4],
    pub score: f64,
}
