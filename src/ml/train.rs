//! Minibatch gradient-descent trainer for the energy regressor.
//!
//! Fits the fixed topology against oracle labels with mean squared error
//! over the first 80% of the dataset, then scores held-out MAE on the rest.
//! A model that misses the quality target still exports; only the
//! cross-format verifier can abort the pipeline.

use rand::rngs::StdRng;
use rand::{SeedableRng, seq::SliceRandom};

use crate::dataset::Dataset;
use crate::ml::metrics::{self, RegressionMetrics};
use crate::ml::network::{
    EnergyNet, HIDDEN1_UNITS, HIDDEN2_UNITS, INPUT_DIM, OUTPUT_UNITS, sigmoid,
};

/// Training hyperparameters.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 256,
            learning_rate: 0.1,
            seed: 42,
        }
    }
}

/// Held-out MAE above this threshold trips the non-fatal quality warning.
pub const MAE_TARGET: f32 = 0.05;

/// Fitted parameters plus the held-out quality snapshot.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub net: EnergyNet,
    pub metrics: RegressionMetrics,
}

/// Fit the network to the dataset's first 80% and score the last 20%.
pub fn train(dataset: &Dataset, options: &TrainOptions) -> Result<TrainedModel, String> {
    if dataset.is_empty() {
        return Err("Empty dataset".to_string());
    }
    if dataset.rows.len() != dataset.labels.len() {
        return Err("Mismatched rows/labels lengths".to_string());
    }
    let split = dataset.split();
    if split.train_rows.is_empty() || split.holdout_rows.is_empty() {
        return Err("Dataset too small for an 80/20 split".to_string());
    }
    let batch_size = options.batch_size.max(1);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut net = EnergyNet::init(&mut rng);

    let n = split.train_rows.len();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut pre1 = [0.0f32; HIDDEN1_UNITS];
    let mut hidden1 = [0.0f32; HIDDEN1_UNITS];
    let mut pre2 = [0.0f32; HIDDEN2_UNITS];
    let mut hidden2 = [0.0f32; HIDDEN2_UNITS];

    for epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        let mut epoch_loss = 0.0f32;
        for batch in indices.chunks(batch_size) {
            let mut d_w1 = vec![0.0f32; net.weights1.len()];
            let mut d_b1 = vec![0.0f32; net.bias1.len()];
            let mut d_w2 = vec![0.0f32; net.weights2.len()];
            let mut d_b2 = vec![0.0f32; net.bias2.len()];
            let mut d_w3 = vec![0.0f32; net.weights3.len()];
            let mut d_b3 = vec![0.0f32; net.bias3.len()];

            for &idx in batch {
                let x = &split.train_rows[idx];
                for h in 0..HIDDEN1_UNITS {
                    let mut sum = net.bias1[h];
                    for i in 0..INPUT_DIM {
                        sum += net.weights1[i * HIDDEN1_UNITS + h] * x[i];
                    }
                    pre1[h] = sum;
                    hidden1[h] = sum.max(0.0);
                }
                for h in 0..HIDDEN2_UNITS {
                    let mut sum = net.bias2[h];
                    for g in 0..HIDDEN1_UNITS {
                        sum += net.weights2[g * HIDDEN2_UNITS + h] * hidden1[g];
                    }
                    pre2[h] = sum;
                    hidden2[h] = sum.max(0.0);
                }
                let mut z = net.bias3[0];
                for h in 0..HIDDEN2_UNITS {
                    z += net.weights3[h * OUTPUT_UNITS] * hidden2[h];
                }
                let out = sigmoid(z);

                let y = split.train_labels[idx];
                let err = out - y;
                epoch_loss += err * err;

                // MSE through the output sigmoid.
                let dz3 = err * out * (1.0 - out);
                d_b3[0] += dz3;
                let mut d_hidden2 = [0.0f32; HIDDEN2_UNITS];
                for h in 0..HIDDEN2_UNITS {
                    d_w3[h * OUTPUT_UNITS] += dz3 * hidden2[h];
                    d_hidden2[h] = dz3 * net.weights3[h * OUTPUT_UNITS];
                }
                let mut d_hidden1 = [0.0f32; HIDDEN1_UNITS];
                for h in 0..HIDDEN2_UNITS {
                    if pre2[h] <= 0.0 {
                        continue;
                    }
                    d_b2[h] += d_hidden2[h];
                    for g in 0..HIDDEN1_UNITS {
                        d_w2[g * HIDDEN2_UNITS + h] += d_hidden2[h] * hidden1[g];
                        d_hidden1[g] += d_hidden2[h] * net.weights2[g * HIDDEN2_UNITS + h];
                    }
                }
                for h in 0..HIDDEN1_UNITS {
                    if pre1[h] <= 0.0 {
                        continue;
                    }
                    d_b1[h] += d_hidden1[h];
                    for i in 0..INPUT_DIM {
                        d_w1[i * HIDDEN1_UNITS + h] += d_hidden1[h] * x[i];
                    }
                }
            }

            let scale = options.learning_rate / batch.len() as f32;
            for i in 0..net.weights1.len() {
                net.weights1[i] -= scale * d_w1[i];
            }
            for i in 0..net.bias1.len() {
                net.bias1[i] -= scale * d_b1[i];
            }
            for i in 0..net.weights2.len() {
                net.weights2[i] -= scale * d_w2[i];
            }
            for i in 0..net.bias2.len() {
                net.bias2[i] -= scale * d_b2[i];
            }
            for i in 0..net.weights3.len() {
                net.weights3[i] -= scale * d_w3[i];
            }
            for i in 0..net.bias3.len() {
                net.bias3[i] -= scale * d_b3[i];
            }
        }
        tracing::debug!(
            "epoch {}/{}: train mse {:.6}",
            epoch + 1,
            options.epochs,
            epoch_loss / n as f32
        );
    }

    let mut predicted = Vec::with_capacity(split.holdout_rows.len());
    for row in split.holdout_rows {
        predicted.push(net.forward(row));
    }
    let quality = RegressionMetrics {
        mae: metrics::mean_absolute_error(&predicted, split.holdout_labels),
        rmse: metrics::root_mean_squared_error(&predicted, split.holdout_labels),
        n_holdout: split.holdout_rows.len(),
    };
    if quality.mae > MAE_TARGET {
        tracing::warn!(
            "held-out MAE {:.5} exceeds target {MAE_TARGET}; exporting anyway (consider more epochs)",
            quality.mae
        );
    }
    net.metrics = Some(quality.clone());
    Ok(TrainedModel {
        net,
        metrics: quality,
    })
}
