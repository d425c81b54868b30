//! Metrics calculation modules for multi-attribute evaluation.

pub mod iou;
pub mod ap;
pub mod precision_recall;
pub mod f1_score;

pub use iou::{box_iou, box_iou_matrix};
pub use ap::{ap_per_class, calculate_map, compute_ap, ApMethod};
pub use precision_recall::{calculate_precision_recall, PrecisionRecall};
pub use f1_score::calculate_f1_score;
