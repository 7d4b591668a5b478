//! Multinomial logistic regression trainer
//!
//! Full-batch gradient descent from a zero initialization, so the same data
//! and config always produce the same model.

use coach_ai_core::classifier::softmax;
use coach_ai_core::SoftmaxClassifier;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{Result, TrainerError};

/// Softmax training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty on weights (not biases)
    pub l2: f64,
}

impl Default for SoftmaxConfig {
    fn default() -> Self {
        Self {
            epochs: 300,
            learning_rate: 0.5,
            l2: 1e-3,
        }
    }
}

pub struct SoftmaxTrainer {
    config: SoftmaxConfig,
}

impl SoftmaxTrainer {
    pub fn new(config: SoftmaxConfig) -> Self {
        Self { config }
    }

    /// Fit on `features` with integer `labels` indexing into `classes`
    pub fn train(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        classes: Vec<String>,
    ) -> Result<SoftmaxClassifier> {
        let n_samples = features.len();
        let n_classes = classes.len();
        if n_samples == 0 {
            return Err(TrainerError::Training("no training samples".to_string()));
        }
        if labels.len() != n_samples {
            return Err(TrainerError::Training(format!(
                "{} samples but {} labels",
                n_samples,
                labels.len()
            )));
        }
        if n_classes < 2 {
            return Err(TrainerError::Training(format!(
                "need at least two classes, got {n_classes}"
            )));
        }
        if let Some(bad) = labels.iter().find(|l| **l >= n_classes) {
            return Err(TrainerError::Training(format!("label {bad} out of range")));
        }

        let n_features = features[0].len();
        if let Some(row) = features.iter().find(|r| r.len() != n_features) {
            return Err(TrainerError::Training(format!(
                "ragged feature matrix: expected {} columns, found {}",
                n_features,
                row.len()
            )));
        }

        let (feature_means, feature_scales) = column_statistics(features, n_features);
        let mut model = SoftmaxClassifier {
            classes,
            feature_means,
            feature_scales,
            weights: vec![vec![0.0; n_features]; n_classes],
            biases: vec![0.0; n_classes],
        };

        let standardized: Vec<Vec<f64>> = features.iter().map(|r| model.standardize(r)).collect();
        let n = n_samples as f64;

        for epoch in 0..self.config.epochs {
            let mut weight_grad = vec![vec![0.0; n_features]; n_classes];
            let mut bias_grad = vec![0.0; n_classes];
            let mut loss = 0.0;

            for (x, &label) in standardized.iter().zip(labels) {
                let probabilities = softmax(&model.logits(x));
                loss -= probabilities[label].max(1e-12).ln();

                for (k, p) in probabilities.iter().enumerate() {
                    let error = p - if k == label { 1.0 } else { 0.0 };
                    bias_grad[k] += error;
                    for (g, xi) in weight_grad[k].iter_mut().zip(x) {
                        *g += error * xi;
                    }
                }
            }

            for k in 0..n_classes {
                for (w, g) in model.weights[k].iter_mut().zip(&weight_grad[k]) {
                    *w -= self.config.learning_rate * (g / n + self.config.l2 * *w);
                }
                model.biases[k] -= self.config.learning_rate * bias_grad[k] / n;
            }

            if epoch % 50 == 0 {
                debug!(epoch, loss = loss / n, "softmax training");
            }
        }

        info!(
            samples = n_samples,
            features = n_features,
            classes = n_classes,
            "trained softmax classifier"
        );
        model.validate()?;
        Ok(model)
    }
}

/// Column means and population standard deviations; constant columns get 1.0
fn column_statistics(features: &[Vec<f64>], n_features: usize) -> (Vec<f64>, Vec<f64>) {
    let n = features.len() as f64;
    let mut means = vec![0.0; n_features];
    for row in features {
        for (m, x) in means.iter_mut().zip(row) {
            *m += x / n;
        }
    }

    let mut scales = vec![0.0; n_features];
    for row in features {
        for ((s, x), m) in scales.iter_mut().zip(row).zip(&means) {
            *s += (x - m).powi(2) / n;
        }
    }
    for s in &mut scales {
        *s = s.sqrt();
        if s.is_nan() || *s <= 1e-12 {
            *s = 1.0;
        }
    }
    (means, scales)
}
