//! Evaluation metrics for the regression model.

use serde::{Deserialize, Serialize};

/// Held-out quality snapshot, embedded into the checkpoint artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean absolute error on the holdout portion.
    pub mae: f32,
    /// Root mean squared error on the holdout portion.
    pub rmse: f32,
    /// Number of held-out samples the errors were computed over.
    pub n_holdout: usize,
}

/// Mean absolute error between predictions and labels.
pub fn mean_absolute_error(predicted: &[f32], truth: &[f32]) -> f32 {
    let n = predicted.len().min(truth.len());
    if n == 0 {
        return 0.0;
    }
    let mut total = 0.0f32;
    for i in 0..n {
        total += (predicted[i] - truth[i]).abs();
    }
    total / n as f32
}

/// Root mean squared error between predictions and labels.
pub fn root_mean_squared_error(predicted: &[f32], truth: &[f32]) -> f32 {
    let n = predicted.len().min(truth.len());
    if n == 0 {
        return 0.0;
    }
    let mut total = 0.0f32;
    for i in 0..n {
        let diff = predicted[i] - truth[i];
        total += diff * diff;
    }
    (total / n as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mae_averages_absolute_differences() {
        let mae = mean_absolute_error(&[0.0, 1.0, 0.5], &[0.5, 0.5, 0.5]);
        assert!((mae - (0.5 + 0.5 + 0.0) / 3.0).abs() < 1e-6);
    }

    #[test]
    fn rmse_penalizes_large_errors_more() {
        let rmse = root_mean_squared_error(&[0.0, 1.0], &[1.0, 1.0]);
        assert!((rmse - (0.5f32).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn empty_inputs_report_zero() {
        assert_eq!(mean_absolute_error(&[], &[]), 0.0);
        assert_eq!(root_mean_squared_error(&[], &[]), 0.0);
    }
}
