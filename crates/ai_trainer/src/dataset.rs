//! Raw dataset loading and cleaning
//!
//! Loads every `*_raw_*.json` file in a directory, fills missing values,
//! removes duplicates, filters low-quality rows and produces a deterministic
//! stratified train/test split on the derived difficulty category.

use anyhow::{Context, Result};
use coach_ai_core::config::{QualityFilterConfig, SplitConfig};
use coach_ai_core::scalers::median;
use coach_ai_core::{
    clean_text, derive_category, engagement_category, engagement_scores, CategoricalColumn,
    DifficultyCategory, EngagementCategory, NumericColumn, Record, UNKNOWN_CATEGORY,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::deterministic::LcgRng;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Labeled records ready for preprocessing
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Load and concatenate every `*_raw_*.json` file in `dir`, in file-name order
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read dataset directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.contains("_raw_") && n.ends_with(".json"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            anyhow::bail!("No raw data files (*_raw_*.json) found in {}", dir.display());
        }

        let mut records = Vec::new();
        for file in &files {
            let loaded = Self::from_json_file(file)?;
            info!("Loaded {} records from {}", loaded.len(), file.display());
            records.extend(loaded.records);
        }

        Ok(Self { records })
    }

    /// Load one JSON array of records
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let records: Vec<Record> = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse records in {}", path.display()))?;
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clean text, default categoricals to `"unknown"` and fill numerics with
    /// the column median. Columns with no values at all stay empty.
    pub fn fill_missing(&mut self) {
        for record in &mut self.records {
            record.question = Some(clean_text(record.question.as_deref()));
            record.answer = Some(clean_text(record.answer.as_deref()));
            record.explanation = Some(clean_text(record.explanation.as_deref()));

            for column in CategoricalColumn::ALL {
                let value = record.categorical_or_unknown(column).to_string();
                record.set_categorical(column, Some(value));
            }
        }

        for column in NumericColumn::ALL {
            let values: Vec<f64> = self.records.iter().filter_map(|r| r.numeric(column)).collect();
            let Some(fill) = median(&values) else {
                continue;
            };
            let mut filled = 0usize;
            for record in &mut self.records {
                if record.numeric(column).is_none() {
                    record.set_numeric(column, Some(fill));
                    filled += 1;
                }
            }
            if filled > 0 {
                info!(column = %column, filled, median = fill, "filled missing numeric values");
            }
        }
    }

    /// Drop exact duplicates, then rows whose simplified question was seen before
    pub fn remove_duplicates(&mut self) -> usize {
        let before = self.records.len();

        let mut exact: HashSet<String> = HashSet::new();
        let mut questions: HashSet<String> = HashSet::new();
        self.records.retain(|record| {
            let key = serde_json::to_string(record).unwrap_or_default();
            if !exact.insert(key) {
                return false;
            }
            questions.insert(simplify_question(record.question.as_deref().unwrap_or("")))
        });

        let removed = before - self.records.len();
        info!("Removed {} duplicate entries", removed);
        removed
    }

    /// Keep rows that pass every applicable threshold
    pub fn filter_quality(&mut self, config: &QualityFilterConfig) -> usize {
        let before = self.records.len();
        let length_ok = |text: &Option<String>| match text {
            Some(text) => {
                let len = text.chars().count();
                len >= config.min_text_length && len <= config.max_text_length
            }
            None => true,
        };

        self.records.retain(|record| {
            length_ok(&record.question)
                && length_ok(&record.answer)
                && record.numeric(NumericColumn::Rating).map_or(true, |v| v >= config.min_rating)
                && record.numeric(NumericColumn::Views).map_or(true, |v| v >= config.min_views)
                && record.numeric(NumericColumn::Votes).map_or(true, |v| v >= config.min_votes)
        });

        let removed = before - self.records.len();
        info!("Filtered out {} low-quality entries", removed);
        removed
    }

    /// Difficulty category of every record
    pub fn targets(&self) -> Vec<DifficultyCategory> {
        self.records
            .iter()
            .map(|r| derive_category(r.categorical(CategoricalColumn::Difficulty).unwrap_or(UNKNOWN_CATEGORY)))
            .collect()
    }

    /// Per-category record counts
    pub fn class_distribution(&self) -> BTreeMap<DifficultyCategory, usize> {
        let mut counts = BTreeMap::new();
        for target in self.targets() {
            *counts.entry(target).or_insert(0) += 1;
        }
        counts
    }

    /// Engagement bucket of every record; `None` where the score is 0
    pub fn engagement_targets(&self) -> Vec<Option<EngagementCategory>> {
        engagement_scores(&self.records)
            .into_iter()
            .map(engagement_category)
            .collect()
    }

    /// Per-bucket record counts, unbucketed records left out
    pub fn engagement_distribution(&self) -> BTreeMap<EngagementCategory, usize> {
        let mut counts = BTreeMap::new();
        for target in self.engagement_targets().into_iter().flatten() {
            *counts.entry(target).or_insert(0) += 1;
        }
        counts
    }

    /// Stratified split on the difficulty category. Each class contributes
    /// `round(n * test_size)` rows to the test set, clamped so that classes
    /// with two or more rows keep at least one row on each side.
    pub fn stratified_split(&self, config: &SplitConfig) -> (Dataset, Dataset) {
        let targets = self.targets();
        let mut by_class: BTreeMap<DifficultyCategory, Vec<usize>> = BTreeMap::new();
        for (i, target) in targets.iter().enumerate() {
            by_class.entry(*target).or_default().push(i);
        }

        let mut rng = LcgRng::new(config.seed);
        let mut test_indices = Vec::new();
        for (category, mut indices) in by_class {
            let n = indices.len();
            let mut n_test = (n as f64 * config.test_size).round() as usize;
            if n >= 2 {
                n_test = n_test.clamp(1, n - 1);
            } else {
                warn!(category = %category, "class has a single record; kept in training split");
                n_test = 0;
            }
            rng.shuffle(&mut indices);
            test_indices.extend_from_slice(&indices[..n_test]);
        }

        let test_set: HashSet<usize> = test_indices.into_iter().collect();
        let (mut train, mut test) = (Vec::new(), Vec::new());
        for (i, record) in self.records.iter().enumerate() {
            if test_set.contains(&i) {
                test.push(record.clone());
            } else {
                train.push(record.clone());
            }
        }

        info!("Training set: {} samples, test set: {} samples", train.len(), test.len());
        (Dataset::new(train), Dataset::new(test))
    }
}

/// Lowercase, strip punctuation and collapse whitespace
pub fn simplify_question(question: &str) -> String {
    let lowered = question.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}
