//! Feature assembly
//!
//! The [`FeatureSchema`] is the ordered list of feature names produced at
//! training time. [`FeatureAssembler`] turns one [`Record`] into a vector
//! aligned with that list, using the fitted preprocessing artifacts. Training
//! and serving both go through [`FeatureAssembler::assemble`], so column
//! order and semantics cannot drift between the two.
//!
//! Names declared by the schema but not computed for a record default to
//! `0.0`, as do computed values that are not finite. Both are counted and
//! logged.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use crate::preprocessing::PreprocessingArtifacts;
use crate::record::Record;
use crate::text::{clean_text, document_text, text_statistics, TextStatistics};

/// Prefix of the vectorizer's output columns
pub const TFIDF_PREFIX: &str = "tfidf_";

/// Canonical ordered feature-name list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Every feature the fitted artifacts can produce, in canonical order:
    /// raw numerics, scaled numerics, encoded categoricals, text scalars,
    /// then one `tfidf_<i>` per vocabulary column.
    pub fn from_artifacts(artifacts: &PreprocessingArtifacts) -> Self {
        let mut names = Vec::new();
        names.extend(artifacts.scalers.columns().map(|c| c.name().to_string()));
        names.extend(artifacts.scalers.columns().map(|c| c.scaled_name()));
        names.extend(artifacts.encoders.columns().map(|c| c.encoded_name()));
        names.extend(TextStatistics::FEATURE_NAMES.iter().map(|n| n.to_string()));
        names.extend((0..artifacts.vectorizer.dimension()).map(tfidf_name));
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Declared names the artifacts cannot produce
    pub fn unresolved(&self, artifacts: &PreprocessingArtifacts) -> Vec<String> {
        let producible: HashSet<String> = Self::from_artifacts(artifacts).names.into_iter().collect();
        self.names
            .iter()
            .filter(|name| !producible.contains(*name))
            .cloned()
            .collect()
    }

    /// blake3 over the newline-joined names
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for name in &self.names {
            hasher.update(name.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize().as_bytes())
    }
}

pub fn tfidf_name(index: usize) -> String {
    format!("{TFIDF_PREFIX}{index}")
}

/// One assembled row and the declared names that fell back to `0.0`
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledFeatures {
    pub values: Vec<f64>,
    pub missing: Vec<String>,
    /// Computed but NaN or infinite
    pub nonfinite: Vec<String>,
}

/// Builds feature vectors from records using fitted artifacts and a schema
#[derive(Debug)]
pub struct FeatureAssembler {
    artifacts: PreprocessingArtifacts,
    schema: FeatureSchema,
    missing_feature_total: AtomicU64,
    nonfinite_feature_total: AtomicU64,
}

impl FeatureAssembler {
    pub fn new(artifacts: PreprocessingArtifacts, schema: FeatureSchema) -> Self {
        let unresolved = schema.unresolved(&artifacts);
        if !unresolved.is_empty() {
            warn!(
                count = unresolved.len(),
                names = ?unresolved,
                "schema declares features the preprocessing artifacts cannot produce; they will default to 0.0"
            );
        }

        Self {
            artifacts,
            schema,
            missing_feature_total: AtomicU64::new(0),
            nonfinite_feature_total: AtomicU64::new(0),
        }
    }

    /// Assembler whose schema is everything the artifacts produce
    pub fn from_artifacts(artifacts: PreprocessingArtifacts) -> Self {
        let schema = FeatureSchema::from_artifacts(&artifacts);
        Self::new(artifacts, schema)
    }

    /// Assemble one record. Never fails: missing inputs take their defaults.
    ///
    /// Encoding may extend a categorical vocabulary locally.
    pub fn assemble(&self, record: &Record) -> AssembledFeatures {
        let computed = self.compute(record);

        let mut missing = Vec::new();
        let mut nonfinite = Vec::new();
        let values = self
            .schema
            .names()
            .iter()
            .map(|name| match computed.get(name.as_str()) {
                Some(value) if value.is_finite() => *value,
                Some(_) => {
                    nonfinite.push(name.clone());
                    0.0
                }
                None => {
                    missing.push(name.clone());
                    0.0
                }
            })
            .collect();

        if !missing.is_empty() {
            self.missing_feature_total
                .fetch_add(missing.len() as u64, Ordering::Relaxed);
            warn!(
                count = missing.len(),
                names = ?missing,
                "declared features missing from computed map; defaulted to 0.0"
            );
        }
        if !nonfinite.is_empty() {
            self.nonfinite_feature_total
                .fetch_add(nonfinite.len() as u64, Ordering::Relaxed);
            warn!(
                count = nonfinite.len(),
                names = ?nonfinite,
                "non-finite feature values; defaulted to 0.0"
            );
        }

        AssembledFeatures {
            values,
            missing,
            nonfinite,
        }
    }

    /// Training matrix built through the same path as single-record serving
    pub fn assemble_batch(&self, records: &[Record]) -> Vec<Vec<f64>> {
        records.iter().map(|r| self.assemble(r).values).collect()
    }

    fn compute(&self, record: &Record) -> HashMap<String, f64> {
        let mut features = HashMap::new();

        let question = clean_text(record.question.as_deref());
        let answer = clean_text(record.answer.as_deref());
        let stats = text_statistics(&question, &answer);
        for (name, value) in TextStatistics::FEATURE_NAMES.iter().zip(stats.values()) {
            features.insert(name.to_string(), value);
        }

        for column in self.artifacts.encoders.columns() {
            if let Ok(code) = self
                .artifacts
                .encoders
                .encode(column, record.categorical(column))
            {
                features.insert(column.encoded_name(), f64::from(code));
            }
        }

        for column in self.artifacts.scalers.columns() {
            let raw = record.numeric(column).unwrap_or(0.0);
            if let Ok(scaled) = self.artifacts.scalers.transform(column, raw) {
                features.insert(column.name().to_string(), raw);
                features.insert(column.scaled_name(), scaled);
            }
        }

        let document = document_text(record.question.as_deref(), record.answer.as_deref());
        for (i, value) in self.artifacts.vectorizer.transform(&document).into_iter().enumerate() {
            features.insert(tfidf_name(i), value);
        }

        features
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn artifacts(&self) -> &PreprocessingArtifacts {
        &self.artifacts
    }

    /// Total declared features defaulted to `0.0` since construction
    pub fn missing_feature_total(&self) -> u64 {
        self.missing_feature_total.load(Ordering::Relaxed)
    }

    /// Total computed values replaced by `0.0` for being NaN or infinite
    pub fn nonfinite_feature_total(&self) -> u64 {
        self.nonfinite_feature_total.load(Ordering::Relaxed)
    }

    /// Categories appended to local vocabularies since construction
    pub fn vocabulary_extensions(&self) -> usize {
        self.artifacts.encoders.extension_count()
    }

    /// Unseen categories encoded as overflow since construction
    pub fn vocabulary_overflows(&self) -> u64 {
        self.artifacts.encoders.overflow_count()
    }

    pub fn set_extension_limit(&mut self, limit: usize) {
        self.artifacts.encoders.set_extension_limit(limit);
    }
}
