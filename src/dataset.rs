//! Seeded synthetic dataset generation for distillation training.
//!
//! Draws uniform telemetry vectors, labels them with the reference formula,
//! and stores the normalized rows the network trains on. The generator owns
//! an explicitly seeded rng; the same seed always reproduces the same
//! dataset byte for byte.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::oracle;

/// Number of input features per sample.
pub const FEATURE_DIM: usize = 5;

/// Per-feature divisors applied before the network sees a sample. Part of
/// the model contract, not tunable.
pub const NORMALIZATION: [f64; FEATURE_DIM] = [100.0, 200.0, 100.0, 20.0, 1.0];

/// Uniform sampling range per raw feature (hydration %, heart rate bpm,
/// SpO2 %, lactate mmol/L, fatigue index).
pub const FEATURE_RANGES: [(f64, f64); FEATURE_DIM] = [
    (30.0, 100.0),
    (40.0, 160.0),
    (80.0, 100.0),
    (0.0, 12.0),
    (0.0, 1.0),
];

/// Default dataset size for a full training run.
pub const DEFAULT_SAMPLE_COUNT: usize = 10_000;

/// Raw (unnormalized) telemetry for one sample.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVector {
    pub hydration_pct: f64,
    pub heart_rate_bpm: f64,
    pub spo2_pct: f64,
    pub lactate_mmol: f64,
    pub fatigue_idx: f64,
}

impl FeatureVector {
    /// Normalized row in the fixed feature order.
    pub fn normalized(&self) -> [f32; FEATURE_DIM] {
        [
            (self.hydration_pct / NORMALIZATION[0]) as f32,
            (self.heart_rate_bpm / NORMALIZATION[1]) as f32,
            (self.spo2_pct / NORMALIZATION[2]) as f32,
            (self.lactate_mmol / NORMALIZATION[3]) as f32,
            (self.fatigue_idx / NORMALIZATION[4]) as f32,
        ]
    }
}

/// Labeled, normalized dataset in generation order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub rows: Vec<[f32; FEATURE_DIM]>,
    pub labels: Vec<f32>,
}

/// Borrowed views of the fixed 80/20 fit/holdout split.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSplit<'a> {
    pub train_rows: &'a [[f32; FEATURE_DIM]],
    pub train_labels: &'a [f32],
    pub holdout_rows: &'a [[f32; FEATURE_DIM]],
    pub holdout_labels: &'a [f32],
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first held-out sample. Always `len * 8 / 10`; the split
    /// point is positional, never a random partition.
    pub fn split_index(&self) -> usize {
        self.len() * 8 / 10
    }

    /// Split into the fit portion (first 80%) and holdout (last 20%).
    pub fn split(&self) -> DatasetSplit<'_> {
        let at = self.split_index();
        DatasetSplit {
            train_rows: &self.rows[..at],
            train_labels: &self.labels[..at],
            holdout_rows: &self.rows[at..],
            holdout_labels: &self.labels[at..],
        }
    }
}

/// Errors returned when generating a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("sample count must be positive (got {count})")]
    InvalidSampleCount { count: usize },
}

/// Generate `count` labeled samples from the given seed.
///
/// Labels come from the reference formula with `blood_loss_idx = 0`; see
/// [`oracle::energy_proxy`] for why blood loss is excluded as an input.
pub fn generate(seed: u64, count: usize) -> Result<Dataset, DatasetError> {
    if count == 0 {
        return Err(DatasetError::InvalidSampleCount { count });
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(count);
    let mut labels = Vec::with_capacity(count);
    for _ in 0..count {
        let sample = draw_sample(&mut rng);
        let label = oracle::energy_proxy(
            sample.hydration_pct,
            sample.heart_rate_bpm,
            sample.spo2_pct,
            sample.lactate_mmol,
            sample.fatigue_idx,
            0.0,
        );
        rows.push(sample.normalized());
        labels.push(label as f32);
    }
    Ok(Dataset { rows, labels })
}

fn draw_sample(rng: &mut StdRng) -> FeatureVector {
    FeatureVector {
        hydration_pct: rng.random_range(FEATURE_RANGES[0].0..FEATURE_RANGES[0].1),
        heart_rate_bpm: rng.random_range(FEATURE_RANGES[1].0..FEATURE_RANGES[1].1),
        spo2_pct: rng.random_range(FEATURE_RANGES[2].0..FEATURE_RANGES[2].1),
        lactate_mmol: rng.random_range(FEATURE_RANGES[3].0..FEATURE_RANGES[3].1),
        fatigue_idx: rng.random_range(FEATURE_RANGES[4].0..FEATURE_RANGES[4].1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_dataset_exactly() {
        let a = generate(42, 256).unwrap();
        let b = generate(42, 256).unwrap();
        assert_eq!(a.rows, b.rows);
        for (x, y) in a.labels.iter().zip(b.labels.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate(1, 64).unwrap();
        let b = generate(2, 64).unwrap();
        assert_ne!(a.rows, b.rows);
    }

    #[test]
    fn zero_count_is_a_configuration_error() {
        let err = generate(42, 0).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidSampleCount { count: 0 }));
    }

    #[test]
    fn split_point_is_fixed_index() {
        let dataset = generate(42, 10).unwrap();
        assert_eq!(dataset.split_index(), 8);
        let split = dataset.split();
        assert_eq!(split.train_rows.len(), 8);
        assert_eq!(split.holdout_rows.len(), 2);
        assert_eq!(split.train_labels.len(), 8);
        assert_eq!(split.holdout_labels.len(), 2);
    }

    #[test]
    fn rows_are_normalized_and_labels_in_unit_interval() {
        let dataset = generate(7, 512).unwrap();
        for row in &dataset.rows {
            assert!(row[0] >= 0.30 && row[0] <= 1.0, "hydration {}", row[0]);
            assert!(row[1] >= 0.20 && row[1] <= 0.80, "heart rate {}", row[1]);
            assert!(row[2] >= 0.80 && row[2] <= 1.0, "spo2 {}", row[2]);
            assert!(row[3] >= 0.0 && row[3] <= 0.60, "lactate {}", row[3]);
            assert!(row[4] >= 0.0 && row[4] <= 1.0, "fatigue {}", row[4]);
        }
        for label in &dataset.labels {
            assert!((0.0..=1.0).contains(label), "label {label}");
        }
    }
}
