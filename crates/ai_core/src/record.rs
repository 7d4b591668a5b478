//! Raw labeled records and the canonical column vocabulary
//!
//! Records come from heterogeneous sources, so every field is optional.
//! Defaults for absent values are applied by the consumers (dataset
//! cleaning at training time, the feature assembler at inference time).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel used for any missing categorical value
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// One training or inference example
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,

    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub views: Option<f64>,
    #[serde(default)]
    pub votes: Option<f64>,
    #[serde(default)]
    pub answers_count: Option<f64>,
    #[serde(default)]
    pub reputation: Option<f64>,
    #[serde(default)]
    pub year: Option<f64>,
    #[serde(default)]
    pub enrollment: Option<f64>,
}

/// Categorical columns known to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalColumn {
    Subject,
    Topic,
    Difficulty,
    Source,
}

impl CategoricalColumn {
    pub const ALL: [CategoricalColumn; 4] = [
        CategoricalColumn::Subject,
        CategoricalColumn::Topic,
        CategoricalColumn::Difficulty,
        CategoricalColumn::Source,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoricalColumn::Subject => "subject",
            CategoricalColumn::Topic => "topic",
            CategoricalColumn::Difficulty => "difficulty",
            CategoricalColumn::Source => "source",
        }
    }

    /// Feature name produced by the encoder for this column
    pub fn encoded_name(self) -> String {
        format!("{}_encoded", self.name())
    }
}

impl fmt::Display for CategoricalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric columns known to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericColumn {
    Rating,
    Views,
    Votes,
    AnswersCount,
    Reputation,
    Year,
    Enrollment,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 7] = [
        NumericColumn::Rating,
        NumericColumn::Views,
        NumericColumn::Votes,
        NumericColumn::AnswersCount,
        NumericColumn::Reputation,
        NumericColumn::Year,
        NumericColumn::Enrollment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericColumn::Rating => "rating",
            NumericColumn::Views => "views",
            NumericColumn::Votes => "votes",
            NumericColumn::AnswersCount => "answers_count",
            NumericColumn::Reputation => "reputation",
            NumericColumn::Year => "year",
            NumericColumn::Enrollment => "enrollment",
        }
    }

    /// Feature name produced by the scaler for this column
    pub fn scaled_name(self) -> String {
        format!("{}_scaled", self.name())
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Record {
    /// Raw categorical value, if present
    pub fn categorical(&self, column: CategoricalColumn) -> Option<&str> {
        let value = match column {
            CategoricalColumn::Subject => &self.subject,
            CategoricalColumn::Topic => &self.topic,
            CategoricalColumn::Difficulty => &self.difficulty,
            CategoricalColumn::Source => &self.source,
        };
        value.as_deref()
    }

    /// Categorical value with the `"unknown"` default applied
    pub fn categorical_or_unknown(&self, column: CategoricalColumn) -> &str {
        match self.categorical(column) {
            Some(value) if !value.is_empty() => value,
            _ => UNKNOWN_CATEGORY,
        }
    }

    pub fn set_categorical(&mut self, column: CategoricalColumn, value: Option<String>) {
        match column {
            CategoricalColumn::Subject => self.subject = value,
            CategoricalColumn::Topic => self.topic = value,
            CategoricalColumn::Difficulty => self.difficulty = value,
            CategoricalColumn::Source => self.source = value,
        }
    }

    /// Raw numeric value, if present and finite
    pub fn numeric(&self, column: NumericColumn) -> Option<f64> {
        let value = match column {
            NumericColumn::Rating => self.rating,
            NumericColumn::Views => self.views,
            NumericColumn::Votes => self.votes,
            NumericColumn::AnswersCount => self.answers_count,
            NumericColumn::Reputation => self.reputation,
            NumericColumn::Year => self.year,
            NumericColumn::Enrollment => self.enrollment,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn set_numeric(&mut self, column: NumericColumn, value: Option<f64>) {
        match column {
            NumericColumn::Rating => self.rating = value,
            NumericColumn::Views => self.views = value,
            NumericColumn::Votes => self.votes = value,
            NumericColumn::AnswersCount => self.answers_count = value,
            NumericColumn::Reputation => self.reputation = value,
            NumericColumn::Year => self.year = value,
            NumericColumn::Enrollment => self.enrollment = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_categorical_defaults_to_unknown() {
        let mut record = Record::default();
        assert_eq!(record.categorical_or_unknown(CategoricalColumn::Subject), "unknown");

        record.subject = Some(String::new());
        assert_eq!(record.categorical_or_unknown(CategoricalColumn::Subject), "unknown");

        record.subject = Some("math".to_string());
        assert_eq!(record.categorical_or_unknown(CategoricalColumn::Subject), "math");
    }

    #[test]
    fn test_non_finite_numeric_is_absent() {
        let record = Record {
            rating: Some(f64::NAN),
            views: Some(500.0),
            ..Default::default()
        };
        assert_eq!(record.numeric(NumericColumn::Rating), None);
        assert_eq!(record.numeric(NumericColumn::Views), Some(500.0));
    }

    #[test]
    fn test_sparse_json_record() {
        let json = r#"{"question": "What is 2+2?", "source": "khan_academy", "views": 120}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.question.as_deref(), Some("What is 2+2?"));
        assert_eq!(record.numeric(NumericColumn::Views), Some(120.0));
        assert_eq!(record.numeric(NumericColumn::Enrollment), None);
    }

    #[test]
    fn test_column_feature_names() {
        assert_eq!(CategoricalColumn::Subject.encoded_name(), "subject_encoded");
        assert_eq!(NumericColumn::AnswersCount.scaled_name(), "answers_count_scaled");
    }
}
