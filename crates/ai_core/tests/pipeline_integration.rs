//! End-to-end pipeline tests: fit, assemble, persist, reload, predict.

use coach_ai_core::{
    AiCoreError, ArtifactStore, BundleMetadata, CategoricalColumn, FeatureAssembler,
    FeatureSchema, ModelBundle, PipelineConfig, PreprocessingArtifacts, Record,
    SoftmaxClassifier,
};
use std::fs;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn record(question: &str, answer: &str, subject: &str, difficulty: &str, rating: f64, views: f64) -> Record {
    Record {
        question: Some(question.to_string()),
        answer: Some(answer.to_string()),
        subject: Some(subject.to_string()),
        difficulty: Some(difficulty.to_string()),
        source: Some("khan_academy".to_string()),
        rating: Some(rating),
        views: Some(views),
        ..Default::default()
    }
}

fn algebra_corpus() -> Vec<Record> {
    vec![
        record("Solve for x: 3x + 1 = 10", "x = 3", "math", "beginner", 4.0, 300.0),
        record("Solve for x: 5x - 2 = 8", "x = 2", "math", "easy", 4.8, 900.0),
        record("Solve the linear equation 2y = 14", "y = 7", "math", "medium", 3.9, 150.0),
        record("Factor the quadratic equation x^2 - 9", "(x - 3)(x + 3)", "math", "hard", 4.1, 220.0),
        record("What is photosynthesis in plants?", "Plants convert light energy", "science", "beginner", 4.6, 1200.0),
        record("Why do plants need light energy?", "Light drives photosynthesis", "science", "intermediate", 3.5, 75.0),
        record("Explain recursion in computer science", "A function calling itself", "computer_science", "advanced", 4.3, 640.0),
        record("What is a recursive function call?", "A call to the same function", "computer_science", "medium", 4.0, 310.0),
    ]
}

fn fixture_record() -> Record {
    Record {
        question: Some("Solve for x: 2x + 3 = 7".to_string()),
        answer: Some("x = 2".to_string()),
        subject: Some("math".to_string()),
        difficulty: Some("beginner".to_string()),
        rating: Some(4.5),
        views: Some(500.0),
        ..Default::default()
    }
}

fn classes() -> Vec<String> {
    vec!["advanced".into(), "beginner".into(), "intermediate".into()]
}

fn zero_classifier(n_features: usize) -> SoftmaxClassifier {
    SoftmaxClassifier {
        classes: classes(),
        feature_means: vec![0.0; n_features],
        feature_scales: vec![1.0; n_features],
        weights: vec![vec![0.0; n_features]; 3],
        biases: vec![0.0, 0.5, 0.1],
    }
}

fn save_bundle(store: &ArtifactStore, bundle_id: &str) -> coach_ai_core::SavedBundle {
    let artifacts = PreprocessingArtifacts::fit(&algebra_corpus(), &PipelineConfig::default()).unwrap();
    let schema = FeatureSchema::from_artifacts(&artifacts);
    let classifier = zero_classifier(schema.len());
    let metadata = BundleMetadata::new("difficulty_classifier", bundle_id, schema, classes());
    store.save(metadata, &classifier, &artifacts).unwrap()
}

fn store() -> (TempDir, ArtifactStore) {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path().join("models"), temp.path().join("artifacts"));
    (temp, store)
}

fn bump_mtime(path: &std::path::Path) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(3600))
        .unwrap();
}

#[test]
fn test_fixture_record_assembles_to_declared_shape() {
    let artifacts = PreprocessingArtifacts::fit(&algebra_corpus(), &PipelineConfig::default()).unwrap();
    let math = artifacts
        .encoders
        .get(CategoricalColumn::Subject)
        .unwrap()
        .fitted_code("math")
        .unwrap();
    let assembler = FeatureAssembler::from_artifacts(artifacts);
    let schema = assembler.schema().clone();

    let assembled = assembler.assemble(&fixture_record());
    assert_eq!(assembled.values.len(), schema.len());
    assert!(assembled.missing.is_empty());

    let value = |name: &str| assembled.values[schema.position(name).unwrap()];
    // "+" and "=" are stripped by normalization before measuring
    assert_eq!(value("question_length"), 19.0);
    assert_eq!(value("question_word_count"), 6.0);
    assert_eq!(value("subject_encoded"), f64::from(math));
    assert_eq!(value("rating"), 4.5);
    assert_eq!(value("views"), 500.0);

    for (name, v) in schema.names().iter().zip(&assembled.values) {
        assert!(v.is_finite(), "{name} is not finite");
        if name.starts_with("tfidf_") {
            assert!((0.0..=1.0).contains(v), "{name} = {v} outside [0, 1]");
        }
    }
}

#[test]
fn test_saved_bundle_reproduces_training_vectors() {
    let (_temp, store) = store();
    save_bundle(&store, "20240101_000000");

    let artifacts = PreprocessingArtifacts::fit(&algebra_corpus(), &PipelineConfig::default()).unwrap();
    let in_process = FeatureAssembler::from_artifacts(artifacts);

    let loaded = store.load_latest(true).unwrap();
    assert_eq!(loaded.bundle_id(), "20240101_000000");
    assert!(!loaded.source.mismatched);
    assert_eq!(loaded.schema(), in_process.schema());

    for record in algebra_corpus().iter().chain(std::iter::once(&fixture_record())) {
        assert_eq!(
            loaded.assembler().assemble(record).values,
            in_process.assemble(record).values
        );
    }
}

#[test]
fn test_load_by_id_verifies_hashes() {
    let (_temp, store) = store();
    let saved = save_bundle(&store, "20240101_000000");

    let bundle = store.load("20240101_000000").unwrap();
    let prediction = bundle.predict(&fixture_record()).unwrap();
    assert_eq!(prediction.labels, classes());
    assert_eq!(prediction.predicted_difficulty, "beginner");
    assert_eq!(prediction.probabilities.len(), 3);

    let mut bytes = fs::read(&saved.model_path).unwrap();
    bytes.extend_from_slice(b"\n");
    fs::write(&saved.model_path, bytes).unwrap();
    assert!(matches!(
        store.load("20240101_000000"),
        Err(AiCoreError::IntegrityFailed { .. })
    ));
}

#[test]
fn test_load_unknown_bundle_id() {
    let (_temp, store) = store();
    save_bundle(&store, "20240101_000000");
    assert!(matches!(
        store.load("20990101_000000"),
        Err(AiCoreError::ArtifactNotFound(_))
    ));
}

#[test]
fn test_latest_bundle_wins() {
    let (_temp, store) = store();
    save_bundle(&store, "20240101_000000");
    save_bundle(&store, "20240102_000000");

    let bundle = store.load_latest(true).unwrap();
    assert_eq!(bundle.bundle_id(), "20240102_000000");
    assert_eq!(
        store.list_bundles().unwrap(),
        vec!["20240101_000000".to_string(), "20240102_000000".to_string()]
    );
}

#[test]
fn test_mixed_latest_files_are_flagged() {
    let (_temp, store) = store();
    let older = save_bundle(&store, "20240101_000000");
    save_bundle(&store, "20240102_000000");

    bump_mtime(&older.preprocessing_path);

    assert!(matches!(
        store.load_latest(true),
        Err(AiCoreError::BundleMismatch(_))
    ));

    let bundle = store.load_latest(false).unwrap();
    assert!(bundle.source.mismatched);
    assert_eq!(bundle.source.preprocessing_path, older.preprocessing_path);
}

#[test]
fn test_no_bundle_files_is_not_found() {
    let (temp, store) = store();
    fs::create_dir_all(temp.path().join("models")).unwrap();
    fs::create_dir_all(temp.path().join("artifacts")).unwrap();
    assert!(matches!(
        store.load_latest(false),
        Err(AiCoreError::ArtifactNotFound(_))
    ));
}

#[test]
fn test_inference_extensions_are_not_persisted() {
    let (_temp, store) = store();
    save_bundle(&store, "20240101_000000");

    let first = store.load_latest(false).unwrap();
    let mut record = fixture_record();
    record.subject = Some("astronomy".to_string());
    record.source = Some("khan_academy".to_string());
    first.predict(&record).unwrap();
    assert_eq!(first.assembler().vocabulary_extensions(), 1);

    let second = store.load_latest(false).unwrap();
    assert_eq!(second.assembler().vocabulary_extensions(), 0);
    assert_eq!(
        second
            .assembler()
            .artifacts()
            .encoders
            .get(CategoricalColumn::Subject)
            .unwrap()
            .fitted_code("astronomy"),
        None
    );
}

#[test]
fn test_bundle_rejects_mismatched_classifier() {
    let artifacts = PreprocessingArtifacts::fit(&algebra_corpus(), &PipelineConfig::default()).unwrap();
    let schema = FeatureSchema::from_artifacts(&artifacts);
    let classifier = zero_classifier(schema.len() - 1);
    let metadata = BundleMetadata::new("difficulty_classifier", "x", schema, classes());
    assert!(ModelBundle::new(metadata, classifier, artifacts).is_err());
}

#[test]
fn test_marker_model_name_is_rejected_before_writing() {
    let (temp, store) = store();
    let artifacts = PreprocessingArtifacts::fit(&algebra_corpus(), &PipelineConfig::default()).unwrap();
    let schema = FeatureSchema::from_artifacts(&artifacts);
    let classifier = zero_classifier(schema.len());

    let metadata = BundleMetadata::new("coach_metadata", "20240101_000000", schema.clone(), classes());
    assert!(matches!(
        store.save(metadata, &classifier, &artifacts),
        Err(AiCoreError::InvalidParameters(_))
    ));
    assert!(!temp.path().join("models").exists());

    let metadata = BundleMetadata::new("coach", "20240101_model_1", schema.clone(), classes());
    assert!(store.save(metadata, &classifier, &artifacts).is_err());

    // A name that merely ends in a marker word still round-trips
    let metadata = BundleMetadata::new("coach_model", "20240101_000000", schema, classes());
    store.save(metadata, &classifier, &artifacts).unwrap();
    let bundle = store.load_latest(true).unwrap();
    assert_eq!(bundle.bundle_id(), "20240101_000000");
    assert_eq!(bundle.metadata.model_name, "coach_model");
    assert_eq!(store.list_bundles().unwrap(), vec!["20240101_000000".to_string()]);
}

#[test]
fn test_loaded_bundle_defaults_missing_inputs() {
    let (_temp, store) = store();
    let mut corpus = algebra_corpus();
    corpus[7].subject = None;
    let artifacts = PreprocessingArtifacts::fit(&corpus, &PipelineConfig::default()).unwrap();
    let schema = FeatureSchema::from_artifacts(&artifacts);
    let classifier = zero_classifier(schema.len());
    let metadata = BundleMetadata::new("difficulty_classifier", "20240101_000000", schema, classes());
    store.save(metadata, &classifier, &artifacts).unwrap();

    let bundle = store.load_latest(true).unwrap();
    let mut record = fixture_record();
    record.rating = None;
    record.subject = None;
    record.source = Some("khan_academy".to_string());
    let assembled = bundle.assembler().assemble(&record);
    let schema = bundle.schema();
    let value = |name: &str| assembled.values[schema.position(name).unwrap()];

    let artifacts = bundle.assembler().artifacts();
    let rating = artifacts.scalers.get(coach_ai_core::NumericColumn::Rating).unwrap();
    assert_eq!(value("rating"), 0.0);
    assert_eq!(value("rating_scaled"), rating.transform(0.0));
    assert_eq!(value("views"), 500.0);

    let unknown = artifacts
        .encoders
        .get(CategoricalColumn::Subject)
        .unwrap()
        .fitted_code("unknown")
        .unwrap();
    assert_eq!(value("subject_encoded"), f64::from(unknown));
    assert_eq!(bundle.assembler().vocabulary_extensions(), 0);
    assert!(assembled.missing.is_empty());
}
