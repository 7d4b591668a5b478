//! Classification metrics on a held-out set

use coach_ai_core::Classifier;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrainerError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Accuracy, support-weighted averages and the confusion matrix
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub accuracy: f64,
    pub precision_weighted: f64,
    pub recall_weighted: f64,
    pub f1_weighted: f64,
    /// `confusion_matrix[true][predicted]`
    pub confusion_matrix: Vec<Vec<usize>>,
    pub per_class: Vec<ClassReport>,
}

pub fn evaluate<C: Classifier + ?Sized>(
    classifier: &C,
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<EvaluationReport> {
    if features.len() != labels.len() {
        return Err(TrainerError::Training(format!(
            "{} samples but {} labels",
            features.len(),
            labels.len()
        )));
    }

    let predicted = features
        .iter()
        .map(|x| classifier.predict(x).map(|(index, _)| index))
        .collect::<coach_ai_core::Result<Vec<usize>>>()?;

    Ok(report(classifier.classes(), labels, &predicted))
}

/// Metrics from true and predicted class indices
pub fn report(classes: &[String], truth: &[usize], predicted: &[usize]) -> EvaluationReport {
    let k = classes.len();
    let mut confusion = vec![vec![0usize; k]; k];
    for (&t, &p) in truth.iter().zip(predicted) {
        if t < k && p < k {
            confusion[t][p] += 1;
        }
    }

    let samples = truth.len();
    let correct: usize = (0..k).map(|i| confusion[i][i]).sum();

    let per_class: Vec<ClassReport> = (0..k)
        .map(|i| {
            let tp = confusion[i][i] as f64;
            let support: usize = confusion[i].iter().sum();
            let predicted_count: usize = confusion.iter().map(|row| row[i]).sum();

            let precision = ratio(tp, predicted_count as f64);
            let recall = ratio(tp, support as f64);
            let f1 = ratio(2.0 * precision * recall, precision + recall);
            ClassReport {
                label: classes[i].clone(),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let weighted = |metric: fn(&ClassReport) -> f64| {
        let total: usize = per_class.iter().map(|c| c.support).sum();
        ratio(
            per_class.iter().map(|c| metric(c) * c.support as f64).sum(),
            total as f64,
        )
    };

    EvaluationReport {
        samples,
        accuracy: ratio(correct as f64, samples as f64),
        precision_weighted: weighted(|c| c.precision),
        recall_weighted: weighted(|c| c.recall),
        f1_weighted: weighted(|c| c.f1),
        confusion_matrix: confusion,
        per_class,
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
