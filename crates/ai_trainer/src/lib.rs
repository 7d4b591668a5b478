//! Coach AI trainer
//!
//! Generates sample data, cleans and splits it, fits the feature pipeline,
//! trains the difficulty classifier and publishes a model bundle.

pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod evaluate;
pub mod generate;
pub mod softmax;
pub mod trainer;

use coach_ai_core::ArtifactStore;
use std::path::Path;

pub use dataset::{simplify_question, Dataset};
pub use deterministic::LcgRng;
pub use errors::TrainerError;
pub use evaluate::{evaluate, EvaluationReport};
pub use generate::{write_raw_datasets, SampleGenerator, Source};
pub use softmax::{SoftmaxConfig, SoftmaxTrainer};
pub use trainer::{TrainingOutcome, TrainingParams, TrainingPipeline};

/// Load raw files from `data_dir`, train, and publish into `store`.
pub fn train_from_dir(
    data_dir: &Path,
    store: &ArtifactStore,
    params: TrainingParams,
) -> Result<TrainingOutcome, TrainerError> {
    let mut dataset =
        Dataset::load_dir(data_dir).map_err(|err| TrainerError::Dataset(format!("{err:#}")))?;
    let pipeline = TrainingPipeline::new(params);
    pipeline.prepare(&mut dataset)?;
    pipeline.run(&dataset, store)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
