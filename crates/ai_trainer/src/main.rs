//! Coach AI trainer CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coach_ai_core::{new_bundle_id, ArtifactStore, PipelineConfig};
use coach_ai_trainer::{train_from_dir, write_raw_datasets, SoftmaxConfig, TrainingParams};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "coach-train")]
#[command(author = "Coach AI Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the Coach AI difficulty classifier", long_about = None)]
struct Args {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write seeded sample datasets for every source
    Generate {
        /// Output directory for *_raw_*.json files
        #[arg(short, long, default_value = "datasets")]
        output: PathBuf,

        /// Records per source
        #[arg(short = 'n', long, default_value = "2000")]
        per_source: usize,

        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Train on raw datasets and publish a model bundle
    Train {
        /// Directory containing *_raw_*.json files
        #[arg(short, long, default_value = "datasets")]
        input: PathBuf,

        /// Model and metadata output directory
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,

        /// Preprocessing artifacts output directory
        #[arg(long, default_value = "processed_datasets")]
        artifacts_dir: PathBuf,

        /// Pipeline configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "difficulty_classifier")]
        model_name: String,

        /// Explicit bundle id; defaults to the current UTC timestamp
        #[arg(long)]
        bundle_id: Option<String>,

        #[arg(long, default_value = "300")]
        epochs: usize,

        #[arg(long, default_value = "0.5")]
        learning_rate: f64,

        #[arg(long, default_value = "0.001")]
        l2: f64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Coach AI Trainer v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Generate {
            output,
            per_source,
            seed,
        } => {
            let written = write_raw_datasets(&output, per_source, seed, &new_bundle_id())
                .context("Failed to write sample datasets")?;
            info!("Wrote {} raw dataset files to {}", written.len(), output.display());
        }
        Command::Train {
            input,
            model_dir,
            artifacts_dir,
            config,
            model_name,
            bundle_id,
            epochs,
            learning_rate,
            l2,
        } => {
            let pipeline = match config {
                Some(path) => PipelineConfig::load_from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => PipelineConfig::default(),
            };

            let params = TrainingParams {
                pipeline,
                softmax: SoftmaxConfig {
                    epochs,
                    learning_rate,
                    l2,
                },
                model_name,
                bundle_id,
            };

            let store = ArtifactStore::new(model_dir, artifacts_dir);
            let outcome = train_from_dir(&input, &store, params).context("Training failed")?;

            info!("✓ Training completed successfully");
            info!("  Bundle: {}", outcome.saved.bundle_id);
            info!("  Model: {}", outcome.saved.model_path.display());
            info!("  Preprocessing: {}", outcome.saved.preprocessing_path.display());
            info!(
                "  Samples: {} train / {} test, {} features",
                outcome.train_samples, outcome.test_samples, outcome.feature_count
            );
            info!(
                "  Test accuracy: {:.4}, weighted F1: {:.4}",
                outcome.test_report.accuracy, outcome.test_report.f1_weighted
            );
        }
    }

    Ok(())
}
