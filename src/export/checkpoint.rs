//! Full-precision checkpoint persistence.
//!
//! The checkpoint is the retraining source of truth: a serde_json dump of
//! the parameter struct. serde_json round-trips `f32` exactly, so a reload
//! reconstructs the network bit for bit.

use std::path::Path;

use crate::export::ExportError;
use crate::ml::network::EnergyNet;

/// Write the checkpoint as one whole-file write.
pub fn save_checkpoint(path: &Path, net: &EnergyNet) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(net)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Reload and validate a checkpoint.
pub fn load_checkpoint(path: &Path) -> Result<EnergyNet, ExportError> {
    let raw = std::fs::read_to_string(path)?;
    let net: EnergyNet = serde_json::from_str(&raw)?;
    net.validate().map_err(ExportError::InvalidModel)?;
    Ok(net)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    #[test]
    fn checkpoint_round_trips_parameters_exactly() {
        let mut rng = StdRng::seed_from_u64(5);
        let net = EnergyNet::init(&mut rng);
        let dir = tempdir().unwrap();
        let path = dir.path().join("ckpt.json");
        save_checkpoint(&path, &net).unwrap();
        let reloaded = load_checkpoint(&path).unwrap();
        for (a, b) in net.weights1.iter().zip(reloaded.weights1.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_eq!(net.weights2, reloaded.weights2);
        assert_eq!(net.weights3, reloaded.weights3);
        assert_eq!(net.bias1, reloaded.bias1);
        assert_eq!(net.bias2, reloaded.bias2);
        assert_eq!(net.bias3, reloaded.bias3);
    }

    #[test]
    fn truncated_checkpoint_is_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        let net = EnergyNet::init(&mut rng);
        let dir = tempdir().unwrap();
        let path = dir.path().join("ckpt.json");
        save_checkpoint(&path, &net).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, &raw[..raw.len() / 2]).unwrap();
        assert!(load_checkpoint(&path).is_err());
    }
}
