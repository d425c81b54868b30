//! F1 Score calculation.

/// Calculate F1 score from precision and recall.
///
/// F1 score is the harmonic mean of precision and recall:
/// F1 = 2 × (Precision × Recall) / (Precision + Recall)
///
/// Returns 0.0 if both precision and recall are 0.
///
/// # Example
///
/// ```
/// use multiattr_eval::metrics::f1_score::calculate_f1_score;
///
/// let f1 = calculate_f1_score(0.8, 0.6);
/// assert!((f1 - 0.6857).abs() < 0.001);
/// ```
pub fn calculate_f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }

    2.0 * (precision * recall) / (precision + recall)
}

/// Index of the confidence grid point with the highest mean F1 across classes.
///
/// `precision[c][i]` and `recall[c][i]` are the curves of class `c` sampled on
/// a shared confidence grid. Ties resolve to the lowest index. Returns 0 for
/// empty input.
pub fn best_mean_f1_index(precision: &[Vec<f64>], recall: &[Vec<f64>]) -> usize {
    let Some(grid_len) = precision.first().map(Vec::len) else {
        return 0;
    };

    let mut best_index = 0;
    let mut best_mean = f64::NEG_INFINITY;
    for i in 0..grid_len {
        let total: f64 = precision
            .iter()
            .zip(recall)
            .map(|(p, r)| calculate_f1_score(p[i], r[i]))
            .sum();
        let mean = total / precision.len() as f64;
        if mean > best_mean {
            best_mean = mean;
            best_index = i;
        }
    }
    best_index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f1_perfect() {
        assert!((calculate_f1_score(1.0, 1.0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_f1_zero() {
        assert_eq!(calculate_f1_score(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_best_mean_f1_index() {
        let precision = vec![vec![1.0, 0.9, 0.2], vec![0.5, 0.8, 0.3]];
        let recall = vec![vec![0.1, 0.8, 1.0], vec![0.2, 0.7, 1.0]];
        assert_eq!(best_mean_f1_index(&precision, &recall), 1);
    }

    #[test]
    fn test_best_mean_f1_index_empty() {
        assert_eq!(best_mean_f1_index(&[], &[]), 0);
    }
}
