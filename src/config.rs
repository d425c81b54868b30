//! Evaluation run configuration.

use serde::{Deserialize, Serialize};

use crate::confusion::{DEFAULT_CONF_THRES, DEFAULT_IOU_THRES};
use crate::error::{EvalError, Result};
use crate::metrics::ap::ApMethod;
use crate::nms::NmsParams;
use crate::threshold::validate_threshold;

/// Settings of one evaluation run.
///
/// Every field has a default, so a JSON document only needs `class_counts`.
///
/// # Example
///
/// ```
/// use multiattr_eval::loader::load_config_from_str;
///
/// let config = load_config_from_str(r#"{"class_counts": [80, 12]}"#).unwrap();
/// assert_eq!(config.n_att(), 2);
/// assert_eq!(config.max_det, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Number of classes of each attribute head
    pub class_counts: Vec<usize>,
    pub conf_thres: f64,
    pub iou_thres: f64,
    pub max_det: usize,
    pub max_nms: usize,
    pub multi_label: bool,
    pub agnostic: bool,
    /// Inject ground-truth boxes into NMS as confidence-1.0 candidates
    pub hybrid: bool,
    pub confusion_conf: f64,
    pub confusion_iou: f64,
    /// Pad the recall curve with 1.0 instead of `recall_last + 0.01`
    pub v5_metric: bool,
    pub ap_method: ApMethod,
    /// Remap attribute-0 classes from the 80-class to the 91-class COCO ids
    pub is_coco: bool,
    /// Collect COCO result records while processing
    pub save_json: bool,
    /// Append the confidence to exported label lines
    pub save_conf: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        let nms = NmsParams::default();
        Self {
            class_counts: vec![1],
            conf_thres: nms.conf_thres,
            iou_thres: nms.iou_thres,
            max_det: nms.max_det,
            max_nms: nms.max_nms,
            multi_label: nms.multi_label,
            agnostic: nms.agnostic,
            hybrid: false,
            confusion_conf: DEFAULT_CONF_THRES,
            confusion_iou: DEFAULT_IOU_THRES,
            v5_metric: false,
            ap_method: ApMethod::default(),
            is_coco: false,
            save_json: false,
            save_conf: false,
        }
    }
}

impl EvalConfig {
    /// Configuration with default settings for the given attribute heads.
    pub fn with_class_counts(class_counts: Vec<usize>) -> Self {
        Self {
            class_counts,
            ..Self::default()
        }
    }

    /// Number of attribute heads.
    pub fn n_att(&self) -> usize {
        self.class_counts.len()
    }

    /// `NMS` parameters derived from this configuration.
    pub fn nms_params(&self) -> NmsParams {
        NmsParams {
            conf_thres: self.conf_thres,
            iou_thres: self.iou_thres,
            max_det: self.max_det,
            max_nms: self.max_nms,
            multi_label: self.multi_label,
            agnostic: self.agnostic,
        }
    }

    /// Check thresholds, caps and class counts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when no attribute is configured or an attribute
    /// has zero classes, `InvalidThreshold` for thresholds outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.class_counts.is_empty() {
            return Err(EvalError::InvalidConfig(
                "at least one attribute head is required".to_string(),
            ));
        }
        if let Some(k) = self.class_counts.iter().position(|&nc| nc == 0) {
            return Err(EvalError::InvalidConfig(format!(
                "attribute {k} has no classes"
            )));
        }
        self.nms_params().validate()?;
        validate_threshold(self.confusion_conf)?;
        validate_threshold(self.confusion_iou)?;
        Ok(())
    }
}
