//! Request and response bodies

use coach_ai_core::{Prediction, Record};
use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// `POST /coach/predict` body
///
/// Omitted fields take the serving defaults; an explicit `null` falls
/// through to the feature assembler's own defaults (`"unknown"` / `0.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub question: String,
    #[serde(default = "default_empty")]
    pub answer: Option<String>,
    #[serde(default = "default_unknown")]
    pub subject: Option<String>,
    #[serde(default = "default_unknown")]
    pub topic: Option<String>,
    #[serde(default = "default_source")]
    pub source: Option<String>,
    #[serde(default = "default_unknown")]
    pub difficulty_hint: Option<String>,
    #[serde(default = "default_rating")]
    pub rating: Option<f64>,
    #[serde(default = "default_views")]
    pub views: Option<f64>,
    #[serde(default = "default_zero")]
    pub votes: Option<f64>,
    #[serde(default = "default_zero")]
    pub answers_count: Option<f64>,
    #[serde(default = "default_zero")]
    pub reputation: Option<f64>,
    #[serde(default = "default_year")]
    pub year: Option<f64>,
    #[serde(default = "default_zero")]
    pub enrollment: Option<f64>,
}

fn default_empty() -> Option<String> {
    Some(String::new())
}

fn default_unknown() -> Option<String> {
    Some("unknown".to_string())
}

fn default_source() -> Option<String> {
    Some("stack_exchange".to_string())
}

fn default_rating() -> Option<f64> {
    Some(4.0)
}

fn default_views() -> Option<f64> {
    Some(100.0)
}

fn default_zero() -> Option<f64> {
    Some(0.0)
}

fn default_year() -> Option<f64> {
    Some(2024.0)
}

impl PredictRequest {
    /// Request with only a question; every other field at its default
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: default_empty(),
            subject: default_unknown(),
            topic: default_unknown(),
            source: default_source(),
            difficulty_hint: default_unknown(),
            rating: default_rating(),
            views: default_views(),
            votes: default_zero(),
            answers_count: default_zero(),
            reputation: default_zero(),
            year: default_year(),
            enrollment: default_zero(),
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.question.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }

        check_range("rating", self.rating, Some(0.0), Some(5.0))?;
        check_range("views", self.views, Some(0.0), None)?;
        check_range("votes", self.votes, None, None)?;
        check_range("answers_count", self.answers_count, Some(0.0), None)?;
        check_range("reputation", self.reputation, Some(0.0), None)?;
        check_range("year", self.year, None, None)?;
        check_range("enrollment", self.enrollment, Some(0.0), None)?;
        Ok(())
    }

    /// The record the assembler sees; `difficulty_hint` fills `difficulty`
    pub fn to_record(&self) -> Record {
        Record {
            question: Some(self.question.trim().to_string()),
            answer: Some(self.answer.as_deref().unwrap_or("").trim().to_string()),
            explanation: None,
            subject: self.subject.clone(),
            topic: self.topic.clone(),
            difficulty: self.difficulty_hint.clone(),
            source: self.source.clone(),
            rating: self.rating,
            views: self.views,
            votes: self.votes,
            answers_count: self.answers_count,
            reputation: self.reputation,
            year: self.year,
            enrollment: self.enrollment,
        }
    }
}

fn check_range(
    field: &str,
    value: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), ServiceError> {
    let Some(value) = value else {
        return Ok(());
    };
    if !value.is_finite() {
        return Err(ServiceError::InvalidInput(format!("{field} must be finite")));
    }
    if let Some(min) = min {
        if value < min {
            return Err(ServiceError::InvalidInput(format!(
                "{field} must be >= {min}, got {value}"
            )));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(ServiceError::InvalidInput(format!(
                "{field} must be <= {max}, got {value}"
            )));
        }
    }
    Ok(())
}

/// `POST /coach/predict` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_difficulty: String,
    pub confidence: f64,
    pub probabilities: Vec<f64>,
    pub labels: Vec<String>,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            predicted_difficulty: prediction.predicted_difficulty,
            confidence: prediction.confidence,
            probabilities: prediction.probabilities,
            labels: prediction.labels,
        }
    }
}

/// `GET /health` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Model file name
    pub model: String,
    pub bundle_id: String,
    pub features: usize,
    pub bundle_mismatch: bool,
    pub version: String,
}

/// Error body for every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
