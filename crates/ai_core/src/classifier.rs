//! Classifier interface and the bundled model format

use serde::{Deserialize, Serialize};

use crate::errors::{AiCoreError, Result};

/// A trained probabilistic classifier over fixed-length feature vectors
pub trait Classifier: Send + Sync {
    /// Class labels, aligned with [`Classifier::predict_proba`] output
    fn classes(&self) -> &[String];

    /// Expected input length
    fn feature_count(&self) -> usize;

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;

    /// Index and probability of the most likely class.
    /// Ties resolve to the lowest index.
    fn predict(&self, features: &[f64]) -> Result<(usize, f64)> {
        argmax(&self.predict_proba(features)?)
    }
}

/// Index and value of the largest probability; ties go to the lowest index
pub fn argmax(probabilities: &[f64]) -> Result<(usize, f64)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
        .ok_or_else(|| AiCoreError::InvalidParameters("classifier has no classes".to_string()))
}

/// Multinomial logistic regression with built-in input standardization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    pub classes: Vec<String>,
    /// Per-feature mean subtracted before the linear layer
    pub feature_means: Vec<f64>,
    /// Per-feature divisor; constant features use 1.0
    pub feature_scales: Vec<f64>,
    /// `classes x features`
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

impl SoftmaxClassifier {
    /// Check that every parameter block agrees on shape
    pub fn validate(&self) -> Result<()> {
        let n_classes = self.classes.len();
        let n_features = self.feature_means.len();

        if n_classes < 2 {
            return Err(AiCoreError::InvalidParameters(format!(
                "need at least two classes, got {n_classes}"
            )));
        }
        if self.feature_scales.len() != n_features {
            return Err(AiCoreError::DimensionMismatch {
                expected: n_features,
                actual: self.feature_scales.len(),
            });
        }
        if self.biases.len() != n_classes || self.weights.len() != n_classes {
            return Err(AiCoreError::InvalidParameters(
                "weights/biases do not match class count".to_string(),
            ));
        }
        if let Some(row) = self.weights.iter().find(|row| row.len() != n_features) {
            return Err(AiCoreError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }
        if self.feature_scales.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(AiCoreError::InvalidParameters(
                "feature scales must be finite and non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Standardize one row with the stored statistics
    pub fn standardize(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.feature_means.iter().zip(&self.feature_scales))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }

    /// Class scores before the softmax
    pub fn logits(&self, standardized: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| row.iter().zip(standardized).map(|(w, x)| w * x).sum::<f64>() + bias)
            .collect()
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let model: SoftmaxClassifier = serde_json::from_slice(bytes)?;
        model.validate()?;
        Ok(model)
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl Classifier for SoftmaxClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn feature_count(&self) -> usize {
        self.feature_means.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.feature_count() {
            return Err(AiCoreError::DimensionMismatch {
                expected: self.feature_count(),
                actual: features.len(),
            });
        }
        Ok(softmax(&self.logits(&self.standardize(features))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SoftmaxClassifier {
        SoftmaxClassifier {
            classes: vec!["beginner".into(), "intermediate".into(), "advanced".into()],
            feature_means: vec![0.0, 10.0],
            feature_scales: vec![1.0, 5.0],
            weights: vec![vec![-1.0, 0.0], vec![0.0, 0.0], vec![1.0, 0.0]],
            biases: vec![0.0, 0.5, 0.0],
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let probs = model().predict_proba(&[2.0, 10.0]).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probs[2] > probs[0]);
    }

    #[test]
    fn test_predict_argmax() {
        let (index, p) = model().predict(&[-3.0, 0.0]).unwrap();
        assert_eq!(index, 0);
        assert!(p > 0.5);
    }

    #[test]
    fn test_argmax_ties_resolve_low() {
        assert_eq!(argmax(&[0.25, 0.5, 0.25]).unwrap(), (1, 0.5));
        assert_eq!(argmax(&[0.5, 0.5]).unwrap(), (0, 0.5));
        assert!(argmax(&[]).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(matches!(
            model().predict_proba(&[1.0]),
            Err(AiCoreError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let model = model();
        let bytes = model.to_json().unwrap();
        let restored = SoftmaxClassifier::from_json(&bytes).unwrap();
        assert_eq!(restored, model);
        assert_eq!(restored.to_json().unwrap(), bytes);
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let mut bad = model();
        bad.weights[1].push(1.0);
        assert!(bad.validate().is_err());

        let mut zero_scale = model();
        zero_scale.feature_scales[0] = 0.0;
        assert!(zero_scale.validate().is_err());
    }

    #[test]
    fn test_softmax_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert_eq!(probs, vec![0.5, 0.5]);
    }
}
