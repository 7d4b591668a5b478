//! TF-IDF text vectorizer
//!
//! Fit once over the training corpus, then applied unchanged to single
//! documents at inference. Output dimensionality and column order are fixed
//! by the fitted vocabulary; terms outside it contribute nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::{debug, instrument};

use crate::errors::{AiCoreError, Result};
use crate::stopwords::StopWords;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("static regex"));

/// Vectorizer hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TfidfConfig {
    /// Vocabulary cap
    pub max_features: usize,
    /// Inclusive n-gram span in tokens
    pub ngram_range: (usize, usize),
    /// Minimum document count a term needs
    pub min_df: usize,
    /// Maximum share of documents a term may appear in
    pub max_df: f64,
    pub stop_words: StopWords,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            ngram_range: (1, 2),
            min_df: 2,
            max_df: 0.8,
            stop_words: StopWords::English,
        }
    }
}

impl TfidfConfig {
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.ngram_range;
        if lo == 0 || lo > hi {
            return Err(AiCoreError::InvalidParameters(format!(
                "invalid ngram_range ({lo}, {hi})"
            )));
        }
        if self.max_features == 0 {
            return Err(AiCoreError::InvalidParameters(
                "max_features must be positive".to_string(),
            ));
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(AiCoreError::InvalidParameters(format!(
                "max_df must be in (0, 1], got {}",
                self.max_df
            )));
        }
        Ok(())
    }
}

/// Serializable fitted state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfState {
    pub config: TfidfConfig,
    /// Vocabulary in column order
    pub terms: Vec<String>,
    /// Inverse document frequency per column
    pub idf: Vec<f64>,
}

/// Fitted TF-IDF vectorizer
#[derive(Clone)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    terms: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl fmt::Debug for TfidfVectorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TfidfVectorizer")
            .field("config", &self.config)
            .field("vocabulary_size", &self.terms.len())
            .finish()
    }
}

impl TfidfVectorizer {
    /// Fit vocabulary and document frequencies over `documents`.
    #[instrument(skip(documents), fields(documents = documents.len()))]
    pub fn fit<S: AsRef<str>>(documents: &[S], config: TfidfConfig) -> Result<Self> {
        config.validate()?;
        if documents.is_empty() {
            return Err(AiCoreError::FitFailed(
                "cannot fit vectorizer on an empty corpus".to_string(),
            ));
        }

        let n_docs = documents.len();
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        let mut corpus_frequency: HashMap<String, usize> = HashMap::new();

        for document in documents {
            let counts = term_counts(document.as_ref(), &config);
            for (term, count) in counts {
                *corpus_frequency.entry(term.clone()).or_insert(0) += count;
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let max_doc_count = config.max_df * n_docs as f64;
        if max_doc_count < config.min_df as f64 {
            return Err(AiCoreError::InvalidParameters(format!(
                "max_df of {} documents is below min_df of {}",
                max_doc_count, config.min_df
            )));
        }

        // BTreeMap iteration keeps survivors in lexical order
        let mut survivors: Vec<(String, usize)> = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= config.min_df && (*df as f64) <= max_doc_count)
            .collect();

        if survivors.len() > config.max_features {
            // Stable sort: equal corpus counts stay lexical
            survivors.sort_by(|(a, _), (b, _)| {
                corpus_frequency
                    .get(b)
                    .unwrap_or(&0)
                    .cmp(corpus_frequency.get(a).unwrap_or(&0))
            });
            survivors.truncate(config.max_features);
            survivors.sort_by(|(a, _), (b, _)| a.cmp(b));
        }

        if survivors.is_empty() {
            return Err(AiCoreError::FitFailed(
                "empty vocabulary after document frequency pruning".to_string(),
            ));
        }

        let n = n_docs as f64;
        let (terms, idf): (Vec<String>, Vec<f64>) = survivors
            .into_iter()
            .map(|(term, df)| {
                let weight = ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0;
                (term, weight)
            })
            .unzip();

        debug!(vocabulary = terms.len(), "fitted tfidf vectorizer");
        Ok(Self::build(config, terms, idf))
    }

    fn build(config: TfidfConfig, terms: Vec<String>, idf: Vec<f64>) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        Self {
            config,
            terms,
            index,
            idf,
        }
    }

    pub fn from_state(state: TfidfState) -> Result<Self> {
        if state.terms.len() != state.idf.len() {
            return Err(AiCoreError::DimensionMismatch {
                expected: state.terms.len(),
                actual: state.idf.len(),
            });
        }
        let distinct: HashSet<&String> = state.terms.iter().collect();
        if distinct.len() != state.terms.len() {
            return Err(AiCoreError::InvalidParameters(
                "duplicate vocabulary terms".to_string(),
            ));
        }
        Ok(Self::build(state.config, state.terms, state.idf))
    }

    pub fn state(&self) -> TfidfState {
        TfidfState {
            config: self.config.clone(),
            terms: self.terms.clone(),
            idf: self.idf.clone(),
        }
    }

    /// Dense TF-IDF row of length [`TfidfVectorizer::dimension`], L2-normalized
    pub fn transform(&self, document: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.terms.len()];
        for (term, count) in term_counts(document, &self.config) {
            if let Some(&column) = self.index.get(&term) {
                row[column] = count as f64 * self.idf[column];
            }
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
        row
    }

    pub fn dimension(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn config(&self) -> &TfidfConfig {
        &self.config
    }
}

/// Lowercased word tokens with stop words removed
pub fn tokenize(text: &str, stop_words: StopWords) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !stop_words.contains(token))
        .map(str::to_string)
        .collect()
}

/// Raw n-gram counts for one document
fn term_counts(text: &str, config: &TfidfConfig) -> HashMap<String, usize> {
    let tokens = tokenize(text, config.stop_words);
    let (lo, hi) = config.ngram_range;
    let mut counts = HashMap::new();

    for n in lo..=hi.min(tokens.len()) {
        for window in tokens.windows(n) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    counts
}
