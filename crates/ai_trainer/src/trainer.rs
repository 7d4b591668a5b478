//! Training orchestration
//!
//! clean → split → fit preprocessing on the training split → assemble both
//! splits through the feature assembler → train → evaluate → publish one
//! bundle through the artifact store.

use coach_ai_core::{
    new_bundle_id, validate_bundle_names, ArtifactStore, BundleMetadata, DifficultyCategory,
    FeatureAssembler, PipelineConfig, PreprocessingArtifacts, SavedBundle,
};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::{info, instrument};

use crate::dataset::Dataset;
use crate::errors::{Result, TrainerError};
use crate::evaluate::{evaluate, EvaluationReport};
use crate::softmax::{SoftmaxConfig, SoftmaxTrainer};

/// Everything a training run needs besides the data
#[derive(Clone, Debug)]
pub struct TrainingParams {
    pub pipeline: PipelineConfig,
    pub softmax: SoftmaxConfig,
    pub model_name: String,
    /// Defaults to a timestamp-derived id
    pub bundle_id: Option<String>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            softmax: SoftmaxConfig::default(),
            model_name: "difficulty_classifier".to_string(),
            bundle_id: None,
        }
    }
}

/// Result of a completed run
#[derive(Debug)]
pub struct TrainingOutcome {
    pub saved: SavedBundle,
    pub train_samples: usize,
    pub test_samples: usize,
    pub feature_count: usize,
    pub train_report: EvaluationReport,
    pub test_report: EvaluationReport,
}

pub struct TrainingPipeline {
    params: TrainingParams,
}

impl TrainingPipeline {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    /// Apply missing-value handling, deduplication and the quality filter
    pub fn prepare(&self, dataset: &mut Dataset) -> Result<()> {
        dataset.fill_missing();
        dataset.remove_duplicates();
        dataset.filter_quality(&self.params.pipeline.quality);

        if dataset.is_empty() {
            return Err(TrainerError::Dataset(
                "no records left after cleaning".to_string(),
            ));
        }
        info!(records = dataset.len(), distribution = ?dataset.class_distribution(), "prepared dataset");
        Ok(())
    }

    /// Run the whole pipeline on an already prepared dataset
    #[instrument(skip_all, fields(records = dataset.len()))]
    pub fn run(&self, dataset: &Dataset, store: &ArtifactStore) -> Result<TrainingOutcome> {
        self.params.pipeline.validate()?;
        let bundle_id = self
            .params
            .bundle_id
            .clone()
            .unwrap_or_else(new_bundle_id);
        validate_bundle_names(&self.params.model_name, &bundle_id)?;

        let (train, test) = dataset.stratified_split(&self.params.pipeline.split);
        if train.is_empty() || test.is_empty() {
            return Err(TrainerError::Dataset(format!(
                "split produced {} training and {} test records",
                train.len(),
                test.len()
            )));
        }

        let artifacts = PreprocessingArtifacts::fit(&train.records, &self.params.pipeline)?;
        let assembler = FeatureAssembler::from_artifacts(artifacts);
        let schema = assembler.schema().clone();

        let train_x = assembler.assemble_batch(&train.records);
        let test_x = assembler.assemble_batch(&test.records);

        let train_targets = train.targets();
        let classes: Vec<DifficultyCategory> = train_targets
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut class_labels: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
        class_labels.sort();

        let index_of = |category: DifficultyCategory| {
            class_labels
                .iter()
                .position(|label| label == category.as_str())
        };
        let train_y: Vec<usize> = train_targets
            .iter()
            .map(|c| index_of(*c).ok_or_else(|| TrainerError::Training(format!("unindexed class {c}"))))
            .collect::<Result<_>>()?;

        // Test rows of a class absent from training cannot be scored
        let (test_x, test_y): (Vec<Vec<f64>>, Vec<usize>) = test_x
            .into_iter()
            .zip(test.targets())
            .filter_map(|(x, c)| index_of(c).map(|i| (x, i)))
            .unzip();

        let classifier =
            SoftmaxTrainer::new(self.params.softmax.clone()).train(&train_x, &train_y, class_labels.clone())?;

        let train_report = evaluate(&classifier, &train_x, &train_y)?;
        let test_report = evaluate(&classifier, &test_x, &test_y)?;
        info!(
            train_accuracy = train_report.accuracy,
            test_accuracy = test_report.accuracy,
            test_f1 = test_report.f1_weighted,
            "evaluated classifier"
        );

        let mut metadata =
            BundleMetadata::new(&self.params.model_name, bundle_id, schema.clone(), class_labels);
        metadata.metrics = json!({
            "train": train_report,
            "test": test_report,
            "train_samples": train.len(),
            "test_samples": test.len(),
            "engagement_distribution": dataset.engagement_distribution(),
            "softmax": self.params.softmax,
        });

        let saved = store.save(metadata, &classifier, assembler.artifacts())?;
        info!(bundle_id = %saved.bundle_id, features = schema.len(), "published model bundle");

        Ok(TrainingOutcome {
            saved,
            train_samples: train.len(),
            test_samples: test.len(),
            feature_count: schema.len(),
            train_report,
            test_report,
        })
    }
}
