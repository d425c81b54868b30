//! # multiattr-eval
//!
//! A Rust library for evaluating multi-attribute object detectors: every
//! detected box carries several independent classifications (object type,
//! color, state, ...) predicted by separate attribute heads.
//!
//! This library provides implementations of the post-inference evaluation pipeline:
//! - **Multi-attribute NMS** grouping boxes by their primary (attribute-0) class
//! - **Letterbox rescaling** of boxes back to original image coordinates
//! - **Greedy matching** of detections against ground truth at IoU=0.50:0.95
//! - **Confusion matrices** with a background row and column, one per attribute
//! - **Precision**, **Recall**, **AP50** and **mAP@0.5:0.95** per attribute and class
//!
//! ## Features
//!
//! - Parallel per-image processing with mergeable accumulators
//! - Label-text and COCO JSON export of detections
//! - JSON configuration and YOLO-style multi-attribute label loading
//! - Polars DataFrame import of labels and export of per-class metrics
//!
//! ## Quick Start
//!
//! ```rust
//! use multiattr_eval::config::EvalConfig;
//! use multiattr_eval::evaluator::Evaluator;
//! use multiattr_eval::types::ImageInput;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Two attribute heads: 80 object classes and 4 colors
//! let mut evaluator = Evaluator::new(EvalConfig::with_class_counts(vec![80, 4]))?;
//!
//! // Feed raw network rows and labels of each image (in actual use)
//! let images: Vec<ImageInput> = Vec::new();
//! evaluator.process_batch(&images)?;
//!
//! // Print results
//! let report = evaluator.finalize();
//! for line in report.summary_lines() {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Label Format
//!
//! Ground-truth label files hold one object per line: the class of every
//! attribute head followed by the normalized center box.
//!
//! ```text
//! c_0 c_1 ... c_{n-1} x_center y_center width height
//! ```

pub mod config;
pub mod confusion;
pub mod error;
pub mod evaluator;
pub mod export;
pub mod geometry;
pub mod loader;
pub mod matching;
pub mod metrics;
pub mod nms;
pub mod polars_utils;
pub mod stats;
pub mod threshold;
pub mod types;

// Re-export commonly used types and functions
pub use config::EvalConfig;
pub use confusion::ConfusionMatrix;
pub use error::{EvalError, Result};
pub use evaluator::{Evaluator, ExternalScore, ExternalScorer};
pub use loader::{load_config_from_file, load_config_from_str, parse_label_lines};
pub use nms::{non_max_suppression_multi_attr, NmsParams};
pub use types::{
    AttributeMetrics, CandidateRow, ClassMetrics, CocoRecord, Detection, EvaluationReport,
    GroundTruthLabel, ImageInput, ImageShape, Letterbox, ShapeInfo,
};
