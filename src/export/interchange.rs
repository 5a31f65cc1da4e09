//! Canonical interchange JSON artifact.
//!
//! The schema the downstream runtime consumes: a functional-style
//! architecture graph, per-layer tensors as base64-encoded little-endian
//! f32 arrays (weights row-major `(n_in, n_out)`, bias `(n_out,)`), one
//! embedded probe test, and a trailing SHA-256 content hash. The hash is
//! computed over the canonical serialization (sorted keys, compact
//! separators) of every field except `hash` itself, so it changes exactly
//! when any stored content changes.

use std::path::Path;

use base64::Engine;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::ml::network::{EnergyNet, INPUT_DIM, INPUT_LAYER_NAME, LAYERS, OUTPUT_UNITS};
use crate::verify::PROBE_INPUT;

/// Errors returned when writing or reading the interchange artifact.
#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("tensor byte length {0} is not a multiple of 4")]
    UnalignedTensor(usize),
    #[error("missing or malformed field: {0}")]
    MissingField(String),
    #[error("content hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch { stored: String, computed: String },
    #[error("architecture mismatch: {0}")]
    ArchitectureMismatch(String),
    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Encode a float slice to base64 over little-endian f32 bytes.
pub fn encode_f32(values: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 little-endian f32 array back into floats.
pub fn decode_f32(encoded: &str) -> Result<Vec<f32>, InterchangeError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    if bytes.len() % 4 != 0 {
        return Err(InterchangeError::UnalignedTensor(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// The embedded self-verification probe: one input row and the expected
/// output the exporting model produced on it.
#[derive(Debug, Clone)]
pub struct ProbeTest {
    pub input: Vec<f32>,
    pub expected: Vec<f32>,
}

/// A fully validated interchange artifact.
#[derive(Debug, Clone)]
pub struct InterchangeModel {
    pub net: EnergyNet,
    pub probe: ProbeTest,
    pub hash: String,
}

/// Build the document body (everything except `hash`).
pub fn build_document(net: &EnergyNet) -> Map<String, Value> {
    let probe_output = net.forward(&PROBE_INPUT);

    let mut layers = Vec::with_capacity(LAYERS.len() + 1);
    layers.push(json!({
        "class_name": "InputLayer",
        "config": {
            "batch_input_shape": [null, INPUT_DIM],
            "dtype": "float32",
            "sparse": false,
            "name": INPUT_LAYER_NAME,
        },
        "inbound_nodes": [],
        "name": INPUT_LAYER_NAME,
    }));
    for spec in &LAYERS {
        layers.push(json!({
            "class_name": "Dense",
            "config": {
                "name": spec.name,
                "trainable": true,
                "dtype": "float32",
                "units": spec.units,
                "activation": spec.activation.as_str(),
                "use_bias": true,
            },
            "inbound_nodes": [[[spec.inbound, 0, 0, {}]]],
            "name": spec.name,
        }));
    }

    let mut params = Map::new();
    for (spec, weights, bias) in net.layer_tensors() {
        params.insert(
            spec.name.to_string(),
            json!({
                "weights": [encode_f32(weights)],
                "bias": [encode_f32(bias)],
            }),
        );
    }

    let output_layer = LAYERS[LAYERS.len() - 1].name;
    let mut doc = Map::new();
    doc.insert(
        "architecture".to_string(),
        json!({
            "class_name": "Model",
            "config": {
                "name": net.model_name,
                "layers": layers,
                "input_layers": [[INPUT_LAYER_NAME, 0, 0]],
                "output_layers": [[output_layer, 0, 0]],
            },
        }),
    );
    doc.insert(
        "image_data_format".to_string(),
        Value::String("channels_last".to_string()),
    );
    doc.insert("input_shapes".to_string(), json!([[INPUT_DIM]]));
    doc.insert("output_shapes".to_string(), json!([[OUTPUT_UNITS]]));
    doc.insert(
        "tests".to_string(),
        json!([{
            "inputs": [{"shape": [INPUT_DIM], "values": [encode_f32(&PROBE_INPUT)]}],
            "outputs": [{"shape": [OUTPUT_UNITS], "values": [encode_f32(&[probe_output])]}],
        }]),
    );
    doc.insert("trainable_params".to_string(), Value::Object(params));
    doc
}

/// SHA-256 hex over the canonical serialization of the document body.
///
/// serde_json object maps iterate in key order and `to_string` emits no
/// whitespace, so this already is the sorted-key, compact-separator form.
pub fn content_hash(doc: &Map<String, Value>) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(doc)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// Write the interchange artifact as one whole-file write; returns the
/// stamped content hash.
pub fn save_interchange(path: &Path, net: &EnergyNet) -> Result<String, InterchangeError> {
    let mut doc = build_document(net);
    let hash = content_hash(&doc)?;
    doc.insert("hash".to_string(), Value::String(hash.clone()));
    let pretty = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, pretty)?;
    Ok(hash)
}

/// Read, hash-check, and decode an interchange artifact.
pub fn load_interchange(path: &Path) -> Result<InterchangeModel, InterchangeError> {
    let raw = std::fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&raw)?;
    let Value::Object(mut map) = doc else {
        return Err(InterchangeError::MissingField("root object".to_string()));
    };
    let stored = match map.remove("hash") {
        Some(Value::String(hash)) => hash,
        _ => return Err(InterchangeError::MissingField("hash".to_string())),
    };
    let computed = content_hash(&map)?;
    if stored != computed {
        return Err(InterchangeError::HashMismatch { stored, computed });
    }
    validate_architecture(&map)?;
    let net = decode_params(&map)?;
    let probe = decode_probe(&map)?;
    Ok(InterchangeModel {
        net,
        probe,
        hash: stored,
    })
}

fn validate_architecture(map: &Map<String, Value>) -> Result<(), InterchangeError> {
    let layers = field(map, "architecture")?
        .get("config")
        .and_then(|config| config.get("layers"))
        .and_then(Value::as_array)
        .ok_or_else(|| InterchangeError::MissingField("architecture.config.layers".to_string()))?;
    if layers.len() != LAYERS.len() + 1 {
        return Err(InterchangeError::ArchitectureMismatch(format!(
            "expected {} layers, found {}",
            LAYERS.len() + 1,
            layers.len()
        )));
    }
    for (spec, layer) in LAYERS.iter().zip(layers.iter().skip(1)) {
        let name = layer.get("name").and_then(Value::as_str).unwrap_or("");
        let config = layer.get("config");
        let units = config
            .and_then(|c| c.get("units"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let activation = config
            .and_then(|c| c.get("activation"))
            .and_then(Value::as_str)
            .unwrap_or("");
        if name != spec.name || units != spec.units || activation != spec.activation.as_str() {
            return Err(InterchangeError::ArchitectureMismatch(format!(
                "layer {name}: {units} units, activation {activation}"
            )));
        }
    }
    Ok(())
}

fn decode_params(map: &Map<String, Value>) -> Result<EnergyNet, InterchangeError> {
    let params = field(map, "trainable_params")?;
    let mut weights = Vec::with_capacity(LAYERS.len());
    let mut biases = Vec::with_capacity(LAYERS.len());
    for spec in &LAYERS {
        let layer = params.get(spec.name).ok_or_else(|| {
            InterchangeError::MissingField(format!("trainable_params.{}", spec.name))
        })?;
        weights.push(decode_tensor_list(
            layer.get("weights"),
            &format!("trainable_params.{}.weights", spec.name),
        )?);
        biases.push(decode_tensor_list(
            layer.get("bias"),
            &format!("trainable_params.{}.bias", spec.name),
        )?);
    }
    let weights: [Vec<f32>; 3] = weights
        .try_into()
        .map_err(|_| InterchangeError::InvalidModel("layer count".to_string()))?;
    let biases: [Vec<f32>; 3] = biases
        .try_into()
        .map_err(|_| InterchangeError::InvalidModel("layer count".to_string()))?;
    EnergyNet::from_parts(weights, biases).map_err(InterchangeError::InvalidModel)
}

fn decode_probe(map: &Map<String, Value>) -> Result<ProbeTest, InterchangeError> {
    let tests = field(map, "tests")?;
    let test = tests
        .get(0)
        .ok_or_else(|| InterchangeError::MissingField("tests[0]".to_string()))?;
    let input = decode_tensor_list(
        test.get("inputs").and_then(|v| v.get(0)).and_then(|v| v.get("values")),
        "tests[0].inputs",
    )?;
    let expected = decode_tensor_list(
        test.get("outputs").and_then(|v| v.get(0)).and_then(|v| v.get("values")),
        "tests[0].outputs",
    )?;
    Ok(ProbeTest { input, expected })
}

fn decode_tensor_list(value: Option<&Value>, name: &str) -> Result<Vec<f32>, InterchangeError> {
    let encoded = value
        .and_then(|v| v.get(0))
        .and_then(Value::as_str)
        .ok_or_else(|| InterchangeError::MissingField(name.to_string()))?;
    decode_f32(encoded)
}

fn field<'a>(map: &'a Map<String, Value>, name: &str) -> Result<&'a Value, InterchangeError> {
    map.get(name)
        .ok_or_else(|| InterchangeError::MissingField(name.to_string()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    fn sample_net() -> EnergyNet {
        let mut rng = StdRng::seed_from_u64(23);
        EnergyNet::init(&mut rng)
    }

    #[test]
    fn f32_encoding_round_trips_exactly() {
        let values = [0.80f32, -0.375, 1e-7, 1234.5678, f32::MIN_POSITIVE];
        let decoded = decode_f32(&encode_f32(&values)).unwrap();
        assert_eq!(decoded.len(), values.len());
        for (a, b) in values.iter().zip(decoded.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn unaligned_tensor_bytes_are_rejected() {
        // "AAA=" decodes to two bytes.
        assert!(matches!(
            decode_f32("AAA="),
            Err(InterchangeError::UnalignedTensor(2))
        ));
    }

    #[test]
    fn embedded_probe_matches_forward_pass() {
        let net = sample_net();
        let dir = tempdir().unwrap();
        let path = dir.path().join("interchange.json");
        save_interchange(&path, &net).unwrap();
        let model = load_interchange(&path).unwrap();
        assert_eq!(model.probe.input.len(), INPUT_DIM);
        assert_eq!(model.probe.expected.len(), 1);
        let input: [f32; INPUT_DIM] = model.probe.input.clone().try_into().unwrap();
        assert_eq!(
            model.net.forward(&input).to_bits(),
            model.probe.expected[0].to_bits()
        );
    }

    #[test]
    fn save_load_round_trips_parameters_exactly() {
        let net = sample_net();
        let dir = tempdir().unwrap();
        let path = dir.path().join("interchange.json");
        let hash = save_interchange(&path, &net).unwrap();
        let model = load_interchange(&path).unwrap();
        assert_eq!(model.hash, hash);
        assert_eq!(model.net.weights1, net.weights1);
        assert_eq!(model.net.weights2, net.weights2);
        assert_eq!(model.net.weights3, net.weights3);
        assert_eq!(model.net.bias1, net.bias1);
        assert_eq!(model.net.bias2, net.bias2);
        assert_eq!(model.net.bias3, net.bias3);
    }

    #[test]
    fn mutating_one_weight_changes_the_hash() {
        let net = sample_net();
        let mut tweaked = net.clone();
        tweaked.weights2[0] += 1e-6;
        let a = content_hash(&build_document(&net)).unwrap();
        let b = content_hash(&build_document(&tweaked)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_stable_for_identical_content() {
        let net = sample_net();
        let a = content_hash(&build_document(&net)).unwrap();
        let b = content_hash(&build_document(&net)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tampered_artifact_fails_the_hash_check() {
        let net = sample_net();
        let dir = tempdir().unwrap();
        let path = dir.path().join("interchange.json");
        save_interchange(&path, &net).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, raw.replace("channels_last", "channels_first")).unwrap();
        assert!(matches!(
            load_interchange(&path),
            Err(InterchangeError::HashMismatch { .. })
        ));
    }

    #[test]
    fn missing_hash_is_rejected() {
        let net = sample_net();
        let dir = tempdir().unwrap();
        let path = dir.path().join("interchange.json");
        let doc = build_document(&net);
        std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        assert!(matches!(
            load_interchange(&path),
            Err(InterchangeError::MissingField(field)) if field == "hash"
        ));
    }
}
