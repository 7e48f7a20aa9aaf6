//! Flood Risk Model Training
//!
//! Generates the synthetic monsoon/dry-season dataset, fits the
//! gradient-boosted tree ensemble, reports held-out accuracy, and writes the
//! JSON artifact the service loads at startup.
//!
//! Usage:
//!   cargo run --release --bin train_model
//!   cargo run --release --bin train_model -- --out models/flood_model.json --trees 200 --seed 7
//!
//! Without `--out`, the artifact goes to `[model] artifact_path` from
//! floodrisk.toml (or `FLOODRISK_MODEL_PATH`).

use floodrisk_service::config::{ServiceConfig, DEFAULT_CONFIG_PATH};
use floodrisk_service::risk::artifact::save_artifact;
use floodrisk_service::training::{train, TrainingConfig};
use std::env;
use std::path::{Path, PathBuf};

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} [--out PATH] [--samples N] [--trees N] [--depth N] [--learning-rate X] [--seed N]",
        program
    );
    std::process::exit(1);
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, program: &str) -> T {
    match args.get(i + 1).and_then(|v| v.parse().ok()) {
        Some(v) => v,
        None => {
            eprintln!("Error: {} requires a valid value", args[i]);
            usage(program)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🧠 Flood Risk Model Training");
    println!("============================\n");

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();
    let mut config = TrainingConfig::default();
    let mut out: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--out" => out = Some(PathBuf::from(parse_value::<String>(&args, i, &program))),
            "--samples" => config.samples = parse_value(&args, i, &program),
            "--trees" => config.n_trees = parse_value(&args, i, &program),
            "--depth" => config.max_depth = parse_value(&args, i, &program),
            "--learning-rate" => config.learning_rate = parse_value(&args, i, &program),
            "--seed" => config.seed = parse_value(&args, i, &program),
            other => {
                eprintln!("Unknown argument: {}", other);
                usage(&program);
            }
        }
        i += 2;
    }

    let out = match out {
        Some(path) => path,
        None => ServiceConfig::load_with_env(Path::new(DEFAULT_CONFIG_PATH))?.model.artifact_path,
    };

    let (ensemble, report) = train(&config)?;

    println!("\n📊 Held-out evaluation ({} train / {} test)", report.train_size, report.test_size);
    println!("   MAE: {:.4}", report.metrics.mae);
    println!("   R²:  {:.4}", report.metrics.r2);
    println!("\n   Top features by split gain:");
    for (name, share) in report.top_features(5) {
        println!("   {:<18} {:.4}", name, share);
    }

    save_artifact(&ensemble, &out)?;

    println!("\n✅ Model trained and saved successfully!");
    println!("   Path: {}", out.display());
    Ok(())
}
