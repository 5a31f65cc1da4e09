//! Fixed-topology feed-forward regressor for the energy proxy.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::FEATURE_DIM;
use crate::ml::metrics::RegressionMetrics;

/// Network input width; equals the telemetry feature count.
pub const INPUT_DIM: usize = FEATURE_DIM;
/// First hidden layer width.
pub const HIDDEN1_UNITS: usize = 16;
/// Second hidden layer width.
pub const HIDDEN2_UNITS: usize = 8;
/// Output width (single energy scalar).
pub const OUTPUT_UNITS: usize = 1;

/// Current parameter-schema version for the checkpoint artifact.
pub const MODEL_VERSION: i64 = 1;
/// Logical model name carried by every artifact.
pub const MODEL_NAME: &str = "sensor_fusion_energy";
/// Name of the input layer in the architecture graph.
pub const INPUT_LAYER_NAME: &str = "telemetry_input";

/// Activation applied by a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    pub fn as_str(self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
        }
    }
}

/// One dense layer in the fixed architecture graph: name, fan-in, units,
/// activation, and the named inbound layer.
#[derive(Debug, Clone, Copy)]
pub struct LayerSpec {
    pub name: &'static str,
    pub inputs: usize,
    pub units: usize,
    pub activation: Activation,
    pub inbound: &'static str,
}

/// The architecture graph as an ordered list. The topology never varies at
/// runtime; artifacts must mirror these shapes exactly.
pub const LAYERS: [LayerSpec; 3] = [
    LayerSpec {
        name: "hidden1",
        inputs: INPUT_DIM,
        units: HIDDEN1_UNITS,
        activation: Activation::Relu,
        inbound: INPUT_LAYER_NAME,
    },
    LayerSpec {
        name: "hidden2",
        inputs: HIDDEN1_UNITS,
        units: HIDDEN2_UNITS,
        activation: Activation::Relu,
        inbound: "hidden1",
    },
    LayerSpec {
        name: "energy_output",
        inputs: HIDDEN2_UNITS,
        units: OUTPUT_UNITS,
        activation: Activation::Sigmoid,
        inbound: "hidden2",
    },
];

/// Trained network parameters. Weights are stored row-major `(n_in, n_out)`;
/// biases are `(n_out,)`. This struct is also the checkpoint payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyNet {
    pub model_version: i64,
    pub model_name: String,
    pub weights1: Vec<f32>,
    pub bias1: Vec<f32>,
    pub weights2: Vec<f32>,
    pub bias2: Vec<f32>,
    pub weights3: Vec<f32>,
    pub bias3: Vec<f32>,
    #[serde(default)]
    pub metrics: Option<RegressionMetrics>,
}

impl EnergyNet {
    /// Fresh network with small uniform random weights and zero biases.
    pub fn init<R: Rng>(rng: &mut R) -> Self {
        let mut init_weights = |len: usize| {
            let mut weights = vec![0.0f32; len];
            for w in &mut weights {
                *w = (rng.random::<f32>() - 0.5) * 0.1;
            }
            weights
        };
        let weights1 = init_weights(INPUT_DIM * HIDDEN1_UNITS);
        let weights2 = init_weights(HIDDEN1_UNITS * HIDDEN2_UNITS);
        let weights3 = init_weights(HIDDEN2_UNITS * OUTPUT_UNITS);
        Self {
            model_version: MODEL_VERSION,
            model_name: MODEL_NAME.to_string(),
            weights1,
            bias1: vec![0.0; HIDDEN1_UNITS],
            weights2,
            bias2: vec![0.0; HIDDEN2_UNITS],
            weights3,
            bias3: vec![0.0; OUTPUT_UNITS],
            metrics: None,
        }
    }

    /// Rebuild a network from per-layer tensors in architecture order.
    pub fn from_parts(
        weights: [Vec<f32>; 3],
        biases: [Vec<f32>; 3],
    ) -> Result<Self, String> {
        let [weights1, weights2, weights3] = weights;
        let [bias1, bias2, bias3] = biases;
        let net = Self {
            model_version: MODEL_VERSION,
            model_name: MODEL_NAME.to_string(),
            weights1,
            bias1,
            weights2,
            bias2,
            weights3,
            bias3,
            metrics: None,
        };
        net.validate()?;
        Ok(net)
    }

    /// Validate parameter shapes against the fixed architecture.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_name != MODEL_NAME {
            return Err(format!(
                "Unsupported model_name {} (expected {})",
                self.model_name, MODEL_NAME
            ));
        }
        if self.model_version != MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {})",
                self.model_version, MODEL_VERSION
            ));
        }
        for (spec, weights, bias) in self.layer_tensors() {
            if weights.len() != spec.inputs * spec.units {
                return Err(format!("{} weights length mismatch", spec.name));
            }
            if bias.len() != spec.units {
                return Err(format!("{} bias length mismatch", spec.name));
            }
        }
        Ok(())
    }

    /// Per-layer `(spec, weights, bias)` views in architecture order.
    pub fn layer_tensors(&self) -> [(&'static LayerSpec, &[f32], &[f32]); 3] {
        [
            (&LAYERS[0], &self.weights1, &self.bias1),
            (&LAYERS[1], &self.weights2, &self.bias2),
            (&LAYERS[2], &self.weights3, &self.bias3),
        ]
    }

    /// Forward pass over one normalized row. The sigmoid output keeps the
    /// prediction inside `[0, 1]`.
    pub fn forward(&self, input: &[f32; INPUT_DIM]) -> f32 {
        let mut hidden1 = [0.0f32; HIDDEN1_UNITS];
        for h in 0..HIDDEN1_UNITS {
            let mut sum = self.bias1[h];
            for i in 0..INPUT_DIM {
                sum += self.weights1[i * HIDDEN1_UNITS + h] * input[i];
            }
            hidden1[h] = sum.max(0.0);
        }

        let mut hidden2 = [0.0f32; HIDDEN2_UNITS];
        for h in 0..HIDDEN2_UNITS {
            let mut sum = self.bias2[h];
            for g in 0..HIDDEN1_UNITS {
                sum += self.weights2[g * HIDDEN2_UNITS + h] * hidden1[g];
            }
            hidden2[h] = sum.max(0.0);
        }

        let mut sum = self.bias3[0];
        for h in 0..HIDDEN2_UNITS {
            sum += self.weights3[h * OUTPUT_UNITS] * hidden2[h];
        }
        sigmoid(sum)
    }
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn init_produces_contract_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = EnergyNet::init(&mut rng);
        net.validate().unwrap();
        assert_eq!(net.weights1.len(), 5 * 16);
        assert_eq!(net.bias1.len(), 16);
        assert_eq!(net.weights2.len(), 16 * 8);
        assert_eq!(net.bias2.len(), 8);
        assert_eq!(net.weights3.len(), 8);
        assert_eq!(net.bias3.len(), 1);
    }

    #[test]
    fn forward_output_stays_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(11);
        let net = EnergyNet::init(&mut rng);
        for row in [
            [0.0f32; INPUT_DIM],
            [1.0; INPUT_DIM],
            [0.80, 0.375, 0.98, 0.10, 0.30],
        ] {
            let out = net.forward(&row);
            assert!((0.0..=1.0).contains(&out), "out of range: {out}");
        }
    }

    #[test]
    fn forward_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(13);
        let net = EnergyNet::init(&mut rng);
        let row = [0.5f32, 0.4, 0.9, 0.2, 0.3];
        assert_eq!(net.forward(&row).to_bits(), net.forward(&row).to_bits());
    }

    #[test]
    fn validate_rejects_wrong_shapes() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = EnergyNet::init(&mut rng);
        net.weights2.pop();
        let err = net.validate().unwrap_err();
        assert!(err.contains("hidden2"));
    }

    #[test]
    fn validate_rejects_foreign_model_name() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = EnergyNet::init(&mut rng);
        net.model_name = "other_model".to_string();
        assert!(net.validate().is_err());
    }
}
