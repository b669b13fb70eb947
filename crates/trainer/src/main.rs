//! CTR Trainer CLI
//!
//! Cleans a click log and trains a reproducible click-through-rate model.

use anyhow::{Context, Result};
use clap::Parser;
use ctr_trainer::{load_and_preprocess, CtrTrainer, PipelineConfig, TracingReporter};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ctr-train")]
#[command(author = "CTR Pipeline Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic click-through-rate model trainer", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input data file (overrides [data].path)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Model output path (overrides [model].path)
    #[arg(short = 'o', long)]
    model_out: Option<PathBuf>,

    /// Random seed for the split and the booster (overrides [training].seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Only load and clean the data, then print the null-count report
    #[arg(long)]
    load_only: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging; RUST_LOG takes precedence over --verbose
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_ascii_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("CTR Trainer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(data) = args.data {
        config.data.path = Some(data);
    }
    if let Some(model_out) = args.model_out {
        config.model.path = Some(model_out);
    }
    if let Some(seed) = args.seed {
        config.training.seed = seed;
    }

    let mut reporter = TracingReporter;

    if args.load_only {
        let data_path = config.data_path().context("Data path required")?;
        let data = load_and_preprocess(data_path, config.delimiter()?, &mut reporter)
            .context("Failed to load dataset")?;
        info!(
            "Loaded {} rows with {} feature columns",
            data.len(),
            data.features.n_columns()
        );
        return Ok(());
    }

    let trainer = CtrTrainer::new(config).context("Invalid configuration")?;
    let outcome = trainer.run(&mut reporter).context("Training failed")?;

    info!("Training completed successfully");
    info!("  Trees: {}", outcome.tree_count);
    if let Some(best) = outcome.best_iteration {
        info!("  Best iteration: {}", best);
    }
    info!("  Model: {}", outcome.model_path.display());

    Ok(())
}
