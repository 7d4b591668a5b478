//! Model bundle: classifier, preprocessing artifacts and feature schema
//! loaded together and used for single-record prediction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::classifier::{argmax, Classifier, SoftmaxClassifier};
use crate::errors::{AiCoreError, Result};
use crate::features::{FeatureAssembler, FeatureSchema};
use crate::preprocessing::PreprocessingArtifacts;
use crate::record::Record;

/// Contents of the metadata file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub model_name: String,
    pub bundle_id: String,
    pub created_at: DateTime<Utc>,
    /// Ordered feature-name list
    pub feature_names: FeatureSchema,
    pub feature_fingerprint: String,
    pub classes: Vec<String>,
    /// Training and evaluation metrics, free-form
    #[serde(default)]
    pub metrics: serde_json::Value,
    /// blake3 of the model file, filled in on save
    #[serde(default)]
    pub model_hash: String,
    /// blake3 of the preprocessing file, filled in on save
    #[serde(default)]
    pub preprocessing_hash: String,
    #[serde(default)]
    pub library_version: String,
}

impl BundleMetadata {
    pub fn new(
        model_name: impl Into<String>,
        bundle_id: impl Into<String>,
        schema: FeatureSchema,
        classes: Vec<String>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            bundle_id: bundle_id.into(),
            created_at: Utc::now(),
            feature_fingerprint: schema.fingerprint(),
            feature_names: schema,
            classes,
            metrics: serde_json::Value::Null,
            model_hash: String::new(),
            preprocessing_hash: String::new(),
            library_version: crate::VERSION.to_string(),
        }
    }
}

/// Files a bundle was loaded from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BundleSource {
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
    pub preprocessing_path: PathBuf,
    /// The three files carry different bundle ids
    pub mismatched: bool,
}

/// One prediction, rounded for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_difficulty: String,
    pub confidence: f64,
    pub probabilities: Vec<f64>,
    pub labels: Vec<String>,
}

#[derive(Debug)]
pub struct ModelBundle {
    pub metadata: BundleMetadata,
    pub classifier: SoftmaxClassifier,
    assembler: FeatureAssembler,
    pub source: BundleSource,
}

impl ModelBundle {
    pub fn new(
        metadata: BundleMetadata,
        classifier: SoftmaxClassifier,
        artifacts: PreprocessingArtifacts,
    ) -> Result<Self> {
        classifier.validate()?;
        if classifier.feature_count() != metadata.feature_names.len() {
            return Err(AiCoreError::BundleMismatch(format!(
                "classifier expects {} features, schema declares {}",
                classifier.feature_count(),
                metadata.feature_names.len()
            )));
        }
        if classifier.classes() != metadata.classes.as_slice() {
            return Err(AiCoreError::BundleMismatch(
                "classifier classes differ from metadata classes".to_string(),
            ));
        }

        let assembler = FeatureAssembler::new(artifacts, metadata.feature_names.clone());
        Ok(Self {
            metadata,
            classifier,
            assembler,
            source: BundleSource::default(),
        })
    }

    pub fn with_source(mut self, source: BundleSource) -> Self {
        self.source = source;
        self
    }

    /// Cap local vocabulary growth for every categorical encoder
    pub fn set_extension_limit(&mut self, limit: usize) {
        self.assembler.set_extension_limit(limit);
    }

    pub fn predict(&self, record: &Record) -> Result<Prediction> {
        let assembled = self.assembler.assemble(record);
        let probabilities = self.classifier.predict_proba(&assembled.values)?;
        let (index, confidence) = argmax(&probabilities)?;

        debug!(
            predicted = %self.classifier.classes[index],
            confidence,
            missing = assembled.missing.len(),
            nonfinite = assembled.nonfinite.len(),
            "prediction"
        );

        Ok(Prediction {
            predicted_difficulty: self.classifier.classes[index].clone(),
            confidence: round4(confidence),
            probabilities: probabilities.into_iter().map(round4).collect(),
            labels: self.classifier.classes.clone(),
        })
    }

    pub fn assembler(&self) -> &FeatureAssembler {
        &self.assembler
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.assembler.schema()
    }

    pub fn bundle_id(&self) -> &str {
        &self.metadata.bundle_id
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
