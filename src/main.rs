//! Distillation pipeline: generate the dataset, fit the regressor, export
//! all three artifacts, and cross-verify them.

use std::path::PathBuf;

use fusepack::dataset::{self, DEFAULT_SAMPLE_COUNT};
use fusepack::export::{ArtifactInfo, ExportOptions, export_all};
use fusepack::logging;
use fusepack::ml::train::{MAE_TARGET, TrainOptions, train};
use fusepack::verify;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    logging::init();

    // Surface an unusable output path before training starts.
    std::fs::create_dir_all(&options.out_dir).map_err(|err| {
        format!(
            "Cannot create output directory {}: {err}",
            options.out_dir.display()
        )
    })?;

    println!("=== sensor fusion distillation ===");
    println!(
        "Generating {} samples (seed {}) ...",
        options.samples, options.seed
    );
    let data = dataset::generate(options.seed, options.samples).map_err(|err| err.to_string())?;

    println!(
        "Training {} epochs (batch {}) ...",
        options.epochs, options.batch_size
    );
    let train_options = TrainOptions {
        epochs: options.epochs,
        batch_size: options.batch_size,
        learning_rate: options.learning_rate,
        seed: options.seed,
    };
    let trained = train(&data, &train_options)?;
    println!(
        "holdout MAE {:.5}, RMSE {:.5} (target MAE < {MAE_TARGET})",
        trained.metrics.mae, trained.metrics.rmse
    );

    println!("Exporting ...");
    let export_options = ExportOptions {
        out_dir: options.out_dir.clone(),
    };
    let summary = export_all(&trained.net, &export_options).map_err(|err| err.to_string())?;
    print_artifact("checkpoint", &summary.checkpoint);
    print_artifact("tensorpack", &summary.tensorpack);
    print_artifact("interchange", &summary.interchange);

    let report = verify::verify_cross_format(&options.out_dir).map_err(|err| err.to_string())?;
    println!(
        "cross-format probe: checkpoint={:.6} portable={:.6} diff={:.7}",
        report.checkpoint_output, report.portable_output, report.diff
    );
    let replayed = verify::verify_interchange(&options.out_dir).map_err(|err| err.to_string())?;
    println!("interchange hash and probe verified (probe output {replayed:.6})");
    println!("Done.");
    Ok(())
}

fn print_artifact(kind: &str, info: &ArtifactInfo) {
    println!("  {kind:<12} -> {} ({} bytes)", info.path.display(), info.bytes);
}

#[derive(Debug, Clone)]
struct CliOptions {
    samples: usize,
    epochs: usize,
    batch_size: usize,
    learning_rate: f32,
    seed: u64,
    out_dir: PathBuf,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut samples = DEFAULT_SAMPLE_COUNT;
    let mut epochs = 100usize;
    let mut batch_size = 256usize;
    let mut learning_rate = 0.1f32;
    let mut seed = 42u64;
    let mut out_dir = PathBuf::from("models");

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--samples" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--samples requires a value".to_string())?;
                samples = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --samples value: {value}"))?;
            }
            "--epochs" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--epochs requires a value".to_string())?;
                epochs = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --epochs value: {value}"))?;
            }
            "--batch" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--batch requires a value".to_string())?;
                batch_size = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --batch value: {value}"))?;
            }
            "--learning-rate" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--learning-rate requires a value".to_string())?;
                learning_rate = value
                    .parse::<f32>()
                    .map_err(|_| format!("Invalid --learning-rate value: {value}"))?;
            }
            "--seed" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--seed requires a value".to_string())?;
                seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
            }
            "--out" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--out requires a value".to_string())?;
                out_dir = PathBuf::from(value);
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        samples,
        epochs,
        batch_size,
        learning_rate,
        seed,
        out_dir,
    })
}

fn help_text() -> String {
    [
        "fusepack",
        "",
        "Distills the reference energy formula into a small regressor and",
        "exports checkpoint, tensorpack, and interchange JSON artifacts.",
        "",
        "Usage:",
        "  fusepack [--out models]",
        "",
        "Options:",
        "  --samples <n>         Dataset size (default 10000)",
        "  --epochs <n>          Training epochs (default 100)",
        "  --batch <n>           Batch size (default 256)",
        "  --learning-rate <f>   Learning rate (default 0.1)",
        "  --seed <n>            RNG seed (default 42)",
        "  --out <dir>           Output directory (default models)",
    ]
    .join("\n")
}
