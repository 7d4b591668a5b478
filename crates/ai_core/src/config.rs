//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::errors::{AiCoreError, Result};
use crate::record::{CategoricalColumn, NumericColumn};
use crate::tfidf::TfidfConfig;

/// Feature pipeline configuration shared by training and serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Categorical columns to encode
    pub categorical_columns: Vec<CategoricalColumn>,
    /// Numeric columns to scale
    pub numeric_columns: Vec<NumericColumn>,
    /// Text vectorizer parameters
    pub tfidf: TfidfConfig,
    /// Training-set quality thresholds
    pub quality: QualityFilterConfig,
    /// Train/test split
    pub split: SplitConfig,
}

/// Row-level quality thresholds; each applies only when the column exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityFilterConfig {
    pub min_text_length: usize,
    pub max_text_length: usize,
    pub min_rating: f64,
    pub min_views: f64,
    pub min_votes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of each class held out for evaluation
    pub test_size: f64,
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            categorical_columns: CategoricalColumn::ALL.to_vec(),
            numeric_columns: NumericColumn::ALL.to_vec(),
            tfidf: TfidfConfig::default(),
            quality: QualityFilterConfig::default(),
            split: SplitConfig::default(),
        }
    }
}

impl Default for QualityFilterConfig {
    fn default() -> Self {
        Self {
            min_text_length: 10,
            max_text_length: 1000,
            min_rating: 3.0,
            min_views: 10.0,
            min_votes: -2.0,
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file; missing keys take their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading pipeline configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)
            .map_err(|e| AiCoreError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| AiCoreError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        info!("Pipeline configuration saved to: {}", path.display());
        Ok(())
    }

    /// Reject unusable settings; return warnings for odd but workable ones
    pub fn validate(&self) -> Result<Vec<String>> {
        self.tfidf.validate()?;

        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(AiCoreError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.split.test_size
            )));
        }
        if self.quality.min_text_length > self.quality.max_text_length {
            return Err(AiCoreError::Config(
                "min_text_length exceeds max_text_length".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        if self.categorical_columns.is_empty() {
            warnings.push("No categorical columns configured".to_string());
        }
        if self.numeric_columns.is_empty() {
            warnings.push("No numeric columns configured".to_string());
        }
        if !self.categorical_columns.contains(&CategoricalColumn::Difficulty) {
            warnings.push("difficulty column is not encoded as a feature".to_string());
        }

        if !warnings.is_empty() {
            warn!("Configuration validation warnings: {:?}", warnings);
        }
        Ok(warnings)
    }
}
