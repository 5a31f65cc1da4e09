//! Re-verify a previously exported artifact directory.
//!
//! Runs the same cross-format and interchange checks as the pipeline, then
//! spot-checks the decoded model against the reference formula on a small
//! fixed case table.

use std::path::PathBuf;

use fusepack::dataset::NORMALIZATION;
use fusepack::export::{INTERCHANGE_FILE_NAME, interchange};
use fusepack::logging;
use fusepack::oracle;
use fusepack::verify;

/// Normalized telemetry rows for the reference spot check.
const SPOT_CHECK_ROWS: [[f32; 5]; 3] = [
    [0.70, 0.35, 0.98, 0.10, 0.20],
    [0.50, 0.50, 0.92, 0.25, 0.60],
    [0.90, 0.40, 0.99, 0.05, 0.10],
];

/// Maximum tolerated MAE between model and formula across the spot checks.
const SPOT_CHECK_MAE_LIMIT: f32 = 0.08;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    logging::init();

    let report = verify::verify_cross_format(&options.dir).map_err(|err| err.to_string())?;
    println!(
        "cross-format probe ok: checkpoint={:.6} portable={:.6} diff={:.7}",
        report.checkpoint_output, report.portable_output, report.diff
    );
    let replayed = verify::verify_interchange(&options.dir).map_err(|err| err.to_string())?;
    println!("interchange hash and probe ok (output {replayed:.6})");

    let model = interchange::load_interchange(&options.dir.join(INTERCHANGE_FILE_NAME))
        .map_err(|err| err.to_string())?;
    let mut total_err = 0.0f32;
    for row in SPOT_CHECK_ROWS {
        let predicted = model.net.forward(&row);
        let reference = oracle::energy_proxy(
            row[0] as f64 * NORMALIZATION[0],
            row[1] as f64 * NORMALIZATION[1],
            row[2] as f64 * NORMALIZATION[2],
            row[3] as f64 * NORMALIZATION[3],
            row[4] as f64 * NORMALIZATION[4],
            0.0,
        ) as f32;
        let err = (predicted - reference).abs();
        println!("  spot check {row:?}: predicted {predicted:.4}, reference {reference:.4}, err {err:.4}");
        total_err += err;
    }
    let mae = total_err / SPOT_CHECK_ROWS.len() as f32;
    println!("spot-check MAE {mae:.4} (limit {SPOT_CHECK_MAE_LIMIT})");
    if mae > SPOT_CHECK_MAE_LIMIT {
        return Err(format!(
            "spot-check MAE {mae:.4} exceeds limit {SPOT_CHECK_MAE_LIMIT}"
        ));
    }
    println!("All checks passed.");
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    dir: PathBuf,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut dir: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--dir requires a value".to_string())?;
                dir = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let dir = dir.ok_or_else(help_text)?;
    Ok(CliOptions { dir })
}

fn help_text() -> String {
    [
        "fusepack-verify",
        "",
        "Re-verifies an exported artifact directory: cross-format probe,",
        "interchange content hash, embedded probe test, and a spot check",
        "against the reference formula.",
        "",
        "Usage:",
        "  fusepack-verify --dir <artifact_dir>",
    ]
    .join("\n")
}
