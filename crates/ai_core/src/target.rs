//! Target derivation
//!
//! Raw labels from different sources ("hard", "advanced", ...) are first
//! mapped onto one ordinal scale and then bucketed into three categories.
//!
//! An engagement score built from views, votes and rating gives a second,
//! optional target with its own three buckets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AiCoreError;
use crate::record::{NumericColumn, Record};

/// Ordinal level assigned to labels missing from the lookup table
pub const DEFAULT_ORDINAL_LEVEL: u8 = 1;

/// Upper bin edges, `(-1, 0.5]`, `(0.5, 1.5]`, `(1.5, 3]`
const BIN_EDGES: [f64; 4] = [-1.0, 0.5, 1.5, 3.0];

/// Three-way difficulty category predicted by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyCategory {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyCategory {
    pub const ALL: [DifficultyCategory; 3] = [
        DifficultyCategory::Beginner,
        DifficultyCategory::Intermediate,
        DifficultyCategory::Advanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyCategory::Beginner => "beginner",
            DifficultyCategory::Intermediate => "intermediate",
            DifficultyCategory::Advanced => "advanced",
        }
    }
}

impl fmt::Display for DifficultyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyCategory {
    type Err = AiCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(DifficultyCategory::Beginner),
            "intermediate" => Ok(DifficultyCategory::Intermediate),
            "advanced" => Ok(DifficultyCategory::Advanced),
            other => Err(AiCoreError::InvalidParameters(format!(
                "unknown difficulty category: {other}"
            ))),
        }
    }
}

/// Map a raw difficulty label onto the ordinal scale.
///
/// The lookup is case-sensitive; unknown labels map to medium (1).
pub fn ordinal_level(label: &str) -> u8 {
    match label {
        "beginner" | "easy" => 0,
        "medium" | "intermediate" => 1,
        "hard" | "advanced" => 2,
        _ => DEFAULT_ORDINAL_LEVEL,
    }
}

/// Bucket an ordinal level into a category.
///
/// Returns `None` for levels outside `(-1, 3]`.
pub fn category(level: f64) -> Option<DifficultyCategory> {
    DifficultyCategory::ALL
        .iter()
        .enumerate()
        .find(|(i, _)| level > BIN_EDGES[*i] && level <= BIN_EDGES[i + 1])
        .map(|(_, category)| *category)
}

/// Full two-stage derivation from a raw label
pub fn derive_category(label: &str) -> DifficultyCategory {
    // Every ordinal level produced by the lookup table lies inside the bins.
    category(f64::from(ordinal_level(label))).unwrap_or(DifficultyCategory::Intermediate)
}

/// Columns averaged into the engagement score
pub const ENGAGEMENT_COLUMNS: [NumericColumn; 3] =
    [NumericColumn::Views, NumericColumn::Votes, NumericColumn::Rating];

/// Bin edges for `(0, 0.33]`, `(0.33, 0.67]`, `(0.67, 1]`
const ENGAGEMENT_EDGES: [f64; 4] = [0.0, 0.33, 0.67, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementCategory {
    Low,
    Medium,
    High,
}

impl EngagementCategory {
    pub const ALL: [EngagementCategory; 3] = [
        EngagementCategory::Low,
        EngagementCategory::Medium,
        EngagementCategory::High,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EngagementCategory::Low => "low",
            EngagementCategory::Medium => "medium",
            EngagementCategory::High => "high",
        }
    }
}

impl fmt::Display for EngagementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engagement score of every record, in `[0, 1]`.
///
/// Each engagement column present in at least one record is min-max
/// normalized over `records`; a constant column contributes 0, as does a
/// missing value. The score is the sum divided by the number of present
/// columns. With no present column every score is 0.
pub fn engagement_scores(records: &[Record]) -> Vec<f64> {
    let ranges: Vec<(NumericColumn, f64, f64)> = ENGAGEMENT_COLUMNS
        .iter()
        .filter_map(|&column| {
            let (min, max) = records
                .iter()
                .filter_map(|r| r.numeric(column))
                .fold(None, |range: Option<(f64, f64)>, v| match range {
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                    None => Some((v, v)),
                })?;
            Some((column, min, max))
        })
        .collect();

    if ranges.is_empty() {
        return vec![0.0; records.len()];
    }

    records
        .iter()
        .map(|record| {
            let total: f64 = ranges
                .iter()
                .map(|&(column, min, max)| match record.numeric(column) {
                    Some(v) if max > min => (v - min) / (max - min),
                    _ => 0.0,
                })
                .sum();
            total / ranges.len() as f64
        })
        .collect()
}

/// Bucket an engagement score. Scores of exactly 0 (and anything outside
/// `(0, 1]`) have no bucket.
pub fn engagement_category(score: f64) -> Option<EngagementCategory> {
    EngagementCategory::ALL
        .iter()
        .enumerate()
        .find(|(i, _)| score > ENGAGEMENT_EDGES[*i] && score <= ENGAGEMENT_EDGES[i + 1])
        .map(|(_, category)| *category)
}
