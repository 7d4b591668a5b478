//! Fitted preprocessing transformers persisted as one unit

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::encoders::{CategoricalEncoderRegistry, EncoderState};
use crate::errors::{AiCoreError, Result};
use crate::record::{CategoricalColumn, Record};
use crate::scalers::NumericScalerRegistry;
use crate::text::document_text;
use crate::tfidf::{TfidfState, TfidfVectorizer};

/// Bumped whenever the persisted layout changes
pub const PREPROCESSING_FORMAT_VERSION: u32 = 1;

/// Encoders, scalers and vectorizer fitted together on one training set
#[derive(Debug)]
pub struct PreprocessingArtifacts {
    pub encoders: CategoricalEncoderRegistry,
    pub scalers: NumericScalerRegistry,
    pub vectorizer: TfidfVectorizer,
}

/// Serialized form of [`PreprocessingArtifacts`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingState {
    pub format_version: u32,
    pub encoders: BTreeMap<CategoricalColumn, EncoderState>,
    pub scalers: NumericScalerRegistry,
    pub vectorizer: TfidfState,
}

impl PreprocessingArtifacts {
    /// Fit every transformer named in `config` on `records`.
    ///
    /// Records are expected to carry training-time defaults already
    /// (medians for numerics); missing categoricals fit as `"unknown"`.
    #[instrument(skip(records, config), fields(records = records.len()))]
    pub fn fit(records: &[Record], config: &PipelineConfig) -> Result<Self> {
        if records.is_empty() {
            return Err(AiCoreError::FitFailed(
                "cannot fit preprocessing on zero records".to_string(),
            ));
        }

        let mut encoders = CategoricalEncoderRegistry::new();
        for &column in &config.categorical_columns {
            encoders.fit(
                column,
                records.iter().map(|r| r.categorical_or_unknown(column)),
            )?;
        }

        let mut scalers = NumericScalerRegistry::new();
        for &column in &config.numeric_columns {
            let values: Vec<f64> = records.iter().filter_map(|r| r.numeric(column)).collect();
            if values.is_empty() {
                warn!(column = %column, "numeric column has no values; not scaled");
                continue;
            }
            scalers.fit(column, &values)?;
        }

        let corpus: Vec<String> = records
            .iter()
            .map(|r| document_text(r.question.as_deref(), r.answer.as_deref()))
            .collect();
        let vectorizer = TfidfVectorizer::fit(&corpus, config.tfidf.clone())?;

        info!(
            encoders = config.categorical_columns.len(),
            scalers = scalers.len(),
            vocabulary = vectorizer.dimension(),
            "fitted preprocessing artifacts"
        );

        Ok(Self {
            encoders,
            scalers,
            vectorizer,
        })
    }

    pub fn state(&self) -> PreprocessingState {
        PreprocessingState {
            format_version: PREPROCESSING_FORMAT_VERSION,
            encoders: self.encoders.state(),
            scalers: self.scalers.clone(),
            vectorizer: self.vectorizer.state(),
        }
    }

    pub fn from_state(state: PreprocessingState) -> Result<Self> {
        if state.format_version != PREPROCESSING_FORMAT_VERSION {
            return Err(AiCoreError::InvalidParameters(format!(
                "unsupported preprocessing format version {}",
                state.format_version
            )));
        }

        Ok(Self {
            encoders: CategoricalEncoderRegistry::from_state(state.encoders),
            scalers: state.scalers,
            vectorizer: TfidfVectorizer::from_state(state.vectorizer)?,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.state())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let state: PreprocessingState = bincode::deserialize(bytes)?;
        Self::from_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NumericColumn;

    fn records() -> Vec<Record> {
        let rows = [
            ("Solve the linear equation for x", "x equals two", "math", 4.0),
            ("Solve a quadratic equation by factoring", "roots are two", "math", 5.0),
            ("Explain photosynthesis in plants", "light energy becomes sugar", "science", 3.0),
            ("Why do plants need light energy", "photosynthesis uses light", "science", 4.0),
        ];
        rows.iter()
            .map(|(q, a, s, r)| Record {
                question: Some(q.to_string()),
                answer: Some(a.to_string()),
                subject: Some(s.to_string()),
                rating: Some(*r),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_fit_covers_configured_columns() {
        let artifacts = PreprocessingArtifacts::fit(&records(), &PipelineConfig::default()).unwrap();

        let subject = artifacts.encoders.get(CategoricalColumn::Subject).unwrap();
        assert_eq!(subject.classes(), &["math", "science"]);

        // Absent everywhere, so only the sentinel is known
        let topic = artifacts.encoders.get(CategoricalColumn::Topic).unwrap();
        assert_eq!(topic.classes(), &["unknown"]);

        assert!(artifacts.scalers.contains(NumericColumn::Rating));
        assert!(!artifacts.scalers.contains(NumericColumn::Views));
        assert!(artifacts.vectorizer.dimension() > 0);
    }

    #[test]
    fn test_bytes_round_trip_preserves_state() {
        let artifacts = PreprocessingArtifacts::fit(&records(), &PipelineConfig::default()).unwrap();
        let restored = PreprocessingArtifacts::from_bytes(&artifacts.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.state(), artifacts.state());
    }

    #[test]
    fn test_fit_on_empty_records_fails() {
        assert!(PreprocessingArtifacts::fit(&[], &PipelineConfig::default()).is_err());
    }

    #[test]
    fn test_unsupported_format_version() {
        let artifacts = PreprocessingArtifacts::fit(&records(), &PipelineConfig::default()).unwrap();
        let mut state = artifacts.state();
        state.format_version = 99;
        assert!(PreprocessingArtifacts::from_state(state).is_err());
    }
}
