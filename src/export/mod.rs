//! Artifact export for the trained regressor.
//!
//! One set of parameters becomes three artifacts: the full-precision
//! checkpoint (source of truth for retraining), the portable binary
//! tensorpack (embedded inference), and the canonical interchange JSON
//! (hash-stamped, consumed by the downstream runtime). Each artifact is a
//! single whole-file write with no temp-then-rename step, so an interrupted
//! export can leave the output directory mutually inconsistent; callers
//! must not trust a partially written directory.

pub mod checkpoint;
pub mod interchange;
pub mod tensorpack;

use std::fs::create_dir_all;
use std::path::PathBuf;

use thiserror::Error;

use crate::export::interchange::InterchangeError;
use crate::ml::network::EnergyNet;

/// Checkpoint artifact file name.
pub const CHECKPOINT_FILE_NAME: &str = "sensor_fusion.ckpt.json";
/// Portable tensor-graph artifact file name.
pub const TENSORPACK_FILE_NAME: &str = "sensor_fusion.tpk";
/// Interchange JSON artifact file name.
pub const INTERCHANGE_FILE_NAME: &str = "sensor_fusion_interchange.json";

/// Configuration options for [`export_all`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output directory; created if absent.
    pub out_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("models"),
        }
    }
}

/// Errors returned when exporting artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Interchange(#[from] InterchangeError),
}

/// Path and size of one written artifact.
#[derive(Debug, Clone)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub bytes: u64,
}

impl ArtifactInfo {
    fn for_path(path: PathBuf) -> Result<Self, std::io::Error> {
        let bytes = std::fs::metadata(&path)?.len();
        Ok(Self { path, bytes })
    }
}

/// Summary of an export run.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub checkpoint: ArtifactInfo,
    pub tensorpack: ArtifactInfo,
    pub interchange: ArtifactInfo,
}

/// Write all three artifacts for one parameter set, in a fixed order:
/// checkpoint, then tensorpack, then interchange JSON.
pub fn export_all(net: &EnergyNet, options: &ExportOptions) -> Result<ExportSummary, ExportError> {
    net.validate().map_err(ExportError::InvalidModel)?;
    create_dir_all(&options.out_dir)?;

    let checkpoint_path = options.out_dir.join(CHECKPOINT_FILE_NAME);
    checkpoint::save_checkpoint(&checkpoint_path, net)?;

    // Converted from the checkpoint parameters, never independently fit.
    let tensorpack_path = options.out_dir.join(TENSORPACK_FILE_NAME);
    tensorpack::save_tensorpack(&tensorpack_path, net)?;

    let interchange_path = options.out_dir.join(INTERCHANGE_FILE_NAME);
    interchange::save_interchange(&interchange_path, net)?;

    Ok(ExportSummary {
        checkpoint: ArtifactInfo::for_path(checkpoint_path)?,
        tensorpack: ArtifactInfo::for_path(tensorpack_path)?,
        interchange: ArtifactInfo::for_path(interchange_path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    #[test]
    fn export_all_writes_three_artifacts() {
        let mut rng = StdRng::seed_from_u64(21);
        let net = EnergyNet::init(&mut rng);
        let dir = tempdir().unwrap();
        let options = ExportOptions {
            out_dir: dir.path().join("models"),
        };
        let summary = export_all(&net, &options).unwrap();
        assert!(summary.checkpoint.path.is_file());
        assert!(summary.tensorpack.path.is_file());
        assert!(summary.interchange.path.is_file());
        assert!(summary.checkpoint.bytes > 0);
        assert!(summary.tensorpack.bytes > 0);
        assert!(summary.interchange.bytes > 0);
    }

    #[test]
    fn export_rejects_malformed_parameters() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut net = EnergyNet::init(&mut rng);
        net.bias1.pop();
        let dir = tempdir().unwrap();
        let options = ExportOptions {
            out_dir: dir.path().to_path_buf(),
        };
        assert!(matches!(
            export_all(&net, &options),
            Err(ExportError::InvalidModel(_))
        ));
    }
}
