//! End-to-end training tests
//!
//! Generate → clean → train → publish → reload → predict, and
//! reproducibility of the published artifacts across runs.

use anyhow::Result;
use coach_ai_core::{ArtifactStore, Record};
use coach_ai_trainer::{
    train_from_dir, write_raw_datasets, Dataset, SoftmaxConfig, TrainingParams, TrainingPipeline,
};
use std::path::Path;

fn params(bundle_id: &str) -> TrainingParams {
    TrainingParams {
        softmax: SoftmaxConfig {
            epochs: 60,
            ..SoftmaxConfig::default()
        },
        bundle_id: Some(bundle_id.to_string()),
        ..TrainingParams::default()
    }
}

fn store_in(root: &Path) -> ArtifactStore {
    ArtifactStore::new(root.join("models"), root.join("processed"))
}

#[test]
fn test_train_publish_and_predict() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let data_dir = temp.path().join("datasets");
    write_raw_datasets(&data_dir, 120, 42, "20240101_000000")?;

    let store = store_in(temp.path());
    let outcome = train_from_dir(&data_dir, &store, params("20240101_000001"))?;

    assert!(outcome.train_samples > outcome.test_samples);
    assert!(outcome.test_samples > 0);
    assert!(outcome.saved.model_path.exists());
    assert!(outcome.saved.preprocessing_path.exists());
    assert!(outcome.test_report.accuracy >= 0.0 && outcome.test_report.accuracy <= 1.0);

    let bundle = store.load_latest(true)?;
    assert_eq!(bundle.bundle_id(), "20240101_000001");
    assert_eq!(bundle.schema().len(), outcome.feature_count);
    assert!(!bundle.source.mismatched);

    let prediction = bundle.predict(&Record {
        question: Some("Find the derivative of f(x) = 3x^2".to_string()),
        answer: Some("Using the power rule, f'(x) = 6x^1.".to_string()),
        subject: Some("math".to_string()),
        topic: Some("calculus".to_string()),
        difficulty: Some("advanced".to_string()),
        source: Some("khan_academy".to_string()),
        rating: Some(4.5),
        views: Some(500.0),
        ..Default::default()
    })?;

    assert!(bundle.classifier.classes.contains(&prediction.predicted_difficulty));
    assert_eq!(prediction.probabilities.len(), prediction.labels.len());
    let total: f64 = prediction.probabilities.iter().sum();
    assert!((total - 1.0).abs() < 1e-3);
    assert!(prediction.confidence > 0.0 && prediction.confidence <= 1.0);

    Ok(())
}

#[test]
fn test_metadata_records_metrics() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let data_dir = temp.path().join("datasets");
    write_raw_datasets(&data_dir, 80, 7, "20240101_000000")?;

    let store = store_in(temp.path());
    let outcome = train_from_dir(&data_dir, &store, params("20240101_000002"))?;

    let metadata: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&outcome.saved.metadata_path)?)?;
    assert_eq!(metadata["bundle_id"], "20240101_000002");
    assert!(metadata["metrics"]["test"]["accuracy"].is_number());
    assert!(metadata["metrics"]["engagement_distribution"].is_object());
    assert_eq!(
        metadata["feature_names"].as_array().map(|names| names.len()),
        Some(outcome.feature_count)
    );
    Ok(())
}

#[test]
fn test_training_is_reproducible() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let data_dir = temp.path().join("datasets");
    write_raw_datasets(&data_dir, 80, 42, "20240101_000000")?;

    let first = train_from_dir(&data_dir, &store_in(&temp.path().join("a")), params("20240101_000003"))?;
    let second = train_from_dir(&data_dir, &store_in(&temp.path().join("b")), params("20240101_000003"))?;

    assert_eq!(
        std::fs::read(&first.saved.model_path)?,
        std::fs::read(&second.saved.model_path)?
    );
    assert_eq!(
        std::fs::read(&first.saved.preprocessing_path)?,
        std::fs::read(&second.saved.preprocessing_path)?
    );
    assert_eq!(first.test_report, second.test_report);
    Ok(())
}

#[test]
fn test_cleaning_everything_away_is_an_error() -> Result<()> {
    let mut dataset = Dataset::new(vec![Record {
        question: Some("short".to_string()),
        answer: Some("tiny".to_string()),
        ..Default::default()
    }]);

    let pipeline = TrainingPipeline::new(TrainingParams::default());
    assert!(pipeline.prepare(&mut dataset).is_err());
    Ok(())
}

#[test]
fn test_missing_data_dir_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(temp.path());
    assert!(train_from_dir(&temp.path().join("absent"), &store, params("20240101_000004")).is_err());
}

#[test]
fn test_marker_model_name_fails_before_training() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let data_dir = temp.path().join("datasets");
    write_raw_datasets(&data_dir, 80, 7, "20240101_000000")?;

    let store = store_in(temp.path());
    let params = TrainingParams {
        model_name: "coach_metadata".to_string(),
        ..params("20240101_000005")
    };
    assert!(train_from_dir(&data_dir, &store, params).is_err());
    assert!(!temp.path().join("models").exists());
    Ok(())
}
