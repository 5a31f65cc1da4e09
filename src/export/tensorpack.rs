//! Portable binary tensor-graph artifact ("tensorpack").
//!
//! Runtime-agnostic little-endian encoding of the layer graph and
//! parameters for embedded inference: magic/version header, model name,
//! then one record per layer (name, activation tag, fan-in, units,
//! row-major f32 weights, f32 bias). The conversion from checkpoint
//! parameters is lossless in both directions.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::ml::network::{Activation, EnergyNet, LAYERS, MODEL_NAME};

/// Leading file magic.
pub const TENSORPACK_MAGIC: [u8; 4] = *b"FTPK";
/// Current container format version.
pub const TENSORPACK_VERSION: u32 = 1;

/// Errors returned when decoding a tensorpack.
#[derive(Debug, Error)]
pub enum TensorpackError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad magic (not a tensorpack file)")]
    BadMagic,
    #[error("unsupported tensorpack version {0}")]
    UnsupportedVersion(u32),
    #[error("truncated tensorpack data")]
    Truncated,
    #[error("tensorpack name is not valid UTF-8")]
    InvalidName,
    #[error("unknown activation tag {0}")]
    UnknownActivation(u8),
    #[error("layer {index} mismatch: expected {expected}, found {found}")]
    LayerMismatch {
        index: usize,
        expected: String,
        found: String,
    },
    #[error("invalid model: {0}")]
    InvalidModel(String),
}

fn activation_tag(activation: Activation) -> u8 {
    match activation {
        Activation::Relu => 0,
        Activation::Sigmoid => 1,
    }
}

fn activation_from_tag(tag: u8) -> Result<Activation, TensorpackError> {
    match tag {
        0 => Ok(Activation::Relu),
        1 => Ok(Activation::Sigmoid),
        other => Err(TensorpackError::UnknownActivation(other)),
    }
}

/// Encode the network into the tensorpack byte layout.
pub fn encode_tensorpack(net: &EnergyNet) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&TENSORPACK_MAGIC);
    out.extend_from_slice(&TENSORPACK_VERSION.to_le_bytes());
    write_str(&mut out, &net.model_name);
    out.extend_from_slice(&(LAYERS.len() as u32).to_le_bytes());
    for (spec, weights, bias) in net.layer_tensors() {
        write_str(&mut out, spec.name);
        out.push(activation_tag(spec.activation));
        out.extend_from_slice(&(spec.inputs as u32).to_le_bytes());
        out.extend_from_slice(&(spec.units as u32).to_le_bytes());
        for value in weights {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for value in bias {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

/// Decode a tensorpack back into network parameters, checking every layer
/// record against the fixed architecture.
pub fn decode_tensorpack(data: &[u8]) -> Result<EnergyNet, TensorpackError> {
    let mut cursor = Cursor { data, pos: 0 };
    if cursor.take(4)? != TENSORPACK_MAGIC {
        return Err(TensorpackError::BadMagic);
    }
    let version = cursor.read_u32()?;
    if version != TENSORPACK_VERSION {
        return Err(TensorpackError::UnsupportedVersion(version));
    }
    let name = cursor.read_str()?;
    if name != MODEL_NAME {
        return Err(TensorpackError::InvalidModel(format!(
            "unexpected model name {name}"
        )));
    }
    let layer_count = cursor.read_u32()? as usize;
    if layer_count != LAYERS.len() {
        return Err(TensorpackError::InvalidModel(format!(
            "expected {} layers, found {layer_count}",
            LAYERS.len()
        )));
    }

    let mut weights: Vec<Vec<f32>> = Vec::with_capacity(LAYERS.len());
    let mut biases: Vec<Vec<f32>> = Vec::with_capacity(LAYERS.len());
    for (index, spec) in LAYERS.iter().enumerate() {
        let layer_name = cursor.read_str()?;
        let activation = activation_from_tag(cursor.read_u8()?)?;
        let inputs = cursor.read_u32()? as usize;
        let units = cursor.read_u32()? as usize;
        if layer_name != spec.name
            || activation != spec.activation
            || inputs != spec.inputs
            || units != spec.units
        {
            return Err(TensorpackError::LayerMismatch {
                index,
                expected: format!(
                    "{} {}x{} {}",
                    spec.name,
                    spec.inputs,
                    spec.units,
                    spec.activation.as_str()
                ),
                found: format!("{layer_name} {inputs}x{units} {}", activation.as_str()),
            });
        }
        weights.push(cursor.read_f32s(inputs * units)?);
        biases.push(cursor.read_f32s(units)?);
    }
    if cursor.pos != data.len() {
        return Err(TensorpackError::InvalidModel(
            "trailing bytes after last layer".to_string(),
        ));
    }

    let weights: [Vec<f32>; 3] = weights
        .try_into()
        .map_err(|_| TensorpackError::InvalidModel("layer count".to_string()))?;
    let biases: [Vec<f32>; 3] = biases
        .try_into()
        .map_err(|_| TensorpackError::InvalidModel("layer count".to_string()))?;
    EnergyNet::from_parts(weights, biases).map_err(TensorpackError::InvalidModel)
}

/// Write the tensorpack as one whole-file write.
pub fn save_tensorpack(path: &Path, net: &EnergyNet) -> Result<(), std::io::Error> {
    fs::write(path, encode_tensorpack(net))
}

/// Read and decode a tensorpack file.
pub fn load_tensorpack(path: &Path) -> Result<EnergyNet, TensorpackError> {
    let data = fs::read(path)?;
    decode_tensorpack(&data)
}

fn write_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], TensorpackError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(TensorpackError::Truncated)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, TensorpackError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, TensorpackError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_str(&mut self) -> Result<String, TensorpackError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| TensorpackError::InvalidName)
    }

    fn read_f32s(&mut self, count: usize) -> Result<Vec<f32>, TensorpackError> {
        let bytes = self.take(count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    fn sample_net() -> EnergyNet {
        let mut rng = StdRng::seed_from_u64(17);
        EnergyNet::init(&mut rng)
    }

    #[test]
    fn encode_decode_round_trips_exactly() {
        let net = sample_net();
        let decoded = decode_tensorpack(&encode_tensorpack(&net)).unwrap();
        assert_eq!(net.weights1, decoded.weights1);
        assert_eq!(net.weights2, decoded.weights2);
        assert_eq!(net.weights3, decoded.weights3);
        assert_eq!(net.bias1, decoded.bias1);
        assert_eq!(net.bias2, decoded.bias2);
        assert_eq!(net.bias3, decoded.bias3);
    }

    #[test]
    fn save_load_round_trips_through_file() {
        let net = sample_net();
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.tpk");
        save_tensorpack(&path, &net).unwrap();
        let loaded = load_tensorpack(&path).unwrap();
        assert_eq!(net.weights1, loaded.weights1);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut data = encode_tensorpack(&sample_net());
        data[0] = b'X';
        assert!(matches!(
            decode_tensorpack(&data),
            Err(TensorpackError::BadMagic)
        ));
    }

    #[test]
    fn truncated_data_is_rejected() {
        let data = encode_tensorpack(&sample_net());
        let cut = &data[..data.len() - 5];
        assert!(matches!(
            decode_tensorpack(cut),
            Err(TensorpackError::Truncated)
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut data = encode_tensorpack(&sample_net());
        data.push(0);
        assert!(matches!(
            decode_tensorpack(&data),
            Err(TensorpackError::InvalidModel(_))
        ));
    }

    #[test]
    fn unknown_activation_tag_is_rejected() {
        let mut data = encode_tensorpack(&sample_net());
        // First layer record starts after magic, version, name, layer count.
        let name_len = 4 + MODEL_NAME.len();
        let tag_offset = 4 + 4 + name_len + 4 + (4 + "hidden1".len());
        data[tag_offset] = 9;
        assert!(matches!(
            decode_tensorpack(&data),
            Err(TensorpackError::UnknownActivation(9))
        ));
    }
}
