//! IoU threshold vector and threshold validation.

use crate::error::{EvalError, Result};

/// Number of IoU thresholds used for mAP@0.5:0.95.
pub const NUM_IOU_THRESHOLDS: usize = 10;

/// The fixed IoU threshold vector 0.50:0.05:0.95.
///
/// # Example
///
/// ```
/// use multiattr_eval::threshold::iou_vector;
///
/// let iouv = iou_vector();
/// assert_eq!(iouv.len(), 10);
/// assert!((iouv[0] - 0.5).abs() < 1e-12);
/// assert!((iouv[9] - 0.95).abs() < 1e-12);
/// ```
pub fn iou_vector() -> [f64; NUM_IOU_THRESHOLDS] {
    let mut iouv = [0.0; NUM_IOU_THRESHOLDS];
    for (i, value) in linspace(0.5, 0.95, NUM_IOU_THRESHOLDS).into_iter().enumerate() {
        iouv[i] = value;
    }
    iouv
}

/// Evenly spaced values over `[start, end]`, both ends included.
pub fn linspace(start: f64, end: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step_size = (end - start) / (steps - 1) as f64;
            (0..steps).map(|i| start + step_size * i as f64).collect()
        }
    }
}

/// Validate that a threshold is in the valid range [0.0, 1.0].
pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(EvalError::InvalidThreshold(format!(
            "Threshold must be between 0.0 and 1.0, got {}",
            threshold
        )));
    }
    Ok(())
}
