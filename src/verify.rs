//! Cross-format verification of exported artifacts.
//!
//! The one hard gate in the pipeline: a fixed probe vector must produce
//! numerically matching outputs from the checkpoint and the portable
//! tensorpack. Unlike the trainer's quality warning this check is
//! unconditional, and a failure means already-written artifacts must not be
//! shipped.

use std::path::Path;

use thiserror::Error;

use crate::export::interchange::{self, InterchangeError};
use crate::export::tensorpack::{self, TensorpackError};
use crate::export::{
    CHECKPOINT_FILE_NAME, ExportError, INTERCHANGE_FILE_NAME, TENSORPACK_FILE_NAME, checkpoint,
};
use crate::ml::network::INPUT_DIM;

/// Fixed probe vector (already normalized) fed through every artifact.
pub const PROBE_INPUT: [f32; INPUT_DIM] = [0.80, 0.375, 0.98, 0.10, 0.30];

/// Maximum tolerated probe-output difference between formats.
pub const CROSS_FORMAT_TOLERANCE: f32 = 1e-4;

/// Errors returned by artifact verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(
        "cross-format divergence on probe: checkpoint {checkpoint}, portable {portable}, diff {diff} (tolerance 1e-4)"
    )]
    Divergence {
        checkpoint: f32,
        portable: f32,
        diff: f32,
    },
    #[error("interchange probe replay diverged: stored {stored}, replayed {replayed}")]
    ProbeMismatch { stored: f32, replayed: f32 },
    #[error("interchange probe has malformed shapes (inputs {inputs}, outputs {outputs})")]
    BadProbeShape { inputs: usize, outputs: usize },
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Tensorpack(#[from] TensorpackError),
    #[error(transparent)]
    Interchange(#[from] InterchangeError),
}

/// Probe outputs observed during a successful cross-format check.
#[derive(Debug, Clone, Copy)]
pub struct VerifyReport {
    pub checkpoint_output: f32,
    pub portable_output: f32,
    pub diff: f32,
}

/// Reload checkpoint and tensorpack from `out_dir`, run the probe through
/// both, and fail hard on divergence.
pub fn verify_cross_format(out_dir: &Path) -> Result<VerifyReport, VerifyError> {
    let checkpoint_net = checkpoint::load_checkpoint(&out_dir.join(CHECKPOINT_FILE_NAME))?;
    let portable_net = tensorpack::load_tensorpack(&out_dir.join(TENSORPACK_FILE_NAME))?;
    let checkpoint_output = checkpoint_net.forward(&PROBE_INPUT);
    let portable_output = portable_net.forward(&PROBE_INPUT);
    let diff = (checkpoint_output - portable_output).abs();
    if diff >= CROSS_FORMAT_TOLERANCE {
        return Err(VerifyError::Divergence {
            checkpoint: checkpoint_output,
            portable: portable_output,
            diff,
        });
    }
    Ok(VerifyReport {
        checkpoint_output,
        portable_output,
        diff,
    })
}

/// Validate the interchange artifact's content hash and replay its embedded
/// probe test against the decoded parameters. Returns the replayed output.
pub fn verify_interchange(out_dir: &Path) -> Result<f32, VerifyError> {
    let model = interchange::load_interchange(&out_dir.join(INTERCHANGE_FILE_NAME))?;
    let inputs = model.probe.input.len();
    let outputs = model.probe.expected.len();
    let input: [f32; INPUT_DIM] = model
        .probe
        .input
        .clone()
        .try_into()
        .map_err(|_| VerifyError::BadProbeShape { inputs, outputs })?;
    let stored = match model.probe.expected.as_slice() {
        [value] => *value,
        _ => return Err(VerifyError::BadProbeShape { inputs, outputs }),
    };
    let replayed = model.net.forward(&input);
    if (replayed - stored).abs() >= CROSS_FORMAT_TOLERANCE {
        return Err(VerifyError::ProbeMismatch { stored, replayed });
    }
    Ok(replayed)
}
