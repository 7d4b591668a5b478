//! Per-column standard scalers
//!
//! Scalers are fit once on the training distribution and reapplied unchanged
//! at inference. Values outside the training range extrapolate linearly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::errors::{AiCoreError, Result};
use crate::record::NumericColumn;

/// Mean and population standard deviation of one training column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: f64,
    pub std: f64,
}

impl StandardScaler {
    pub fn fit(values: &[f64]) -> Result<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Err(AiCoreError::FitFailed(
                "standard scaler needs at least one finite value".to_string(),
            ));
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            mean,
            std: variance.sqrt(),
        })
    }

    /// `(value - mean) / std`, or `0.0` for a constant training column
    pub fn transform(&self, value: f64) -> f64 {
        if self.std == 0.0 {
            return 0.0;
        }
        (value - self.mean) / self.std
    }
}

/// Median of the finite values, `None` when there are none
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// One scaler per numeric column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericScalerRegistry {
    scalers: BTreeMap<NumericColumn, StandardScaler>,
}

impl NumericScalerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, column: NumericColumn, values: &[f64]) -> Result<()> {
        let scaler = StandardScaler::fit(values)?;
        debug!(column = %column, mean = scaler.mean, std = scaler.std, "fitted scaler");
        self.scalers.insert(column, scaler);
        Ok(())
    }

    pub fn transform(&self, column: NumericColumn, value: f64) -> Result<f64> {
        self.scalers
            .get(&column)
            .map(|scaler| scaler.transform(value))
            .ok_or_else(|| AiCoreError::UnknownColumn(column.name().to_string()))
    }

    pub fn get(&self, column: NumericColumn) -> Option<&StandardScaler> {
        self.scalers.get(&column)
    }

    pub fn contains(&self, column: NumericColumn) -> bool {
        self.scalers.contains_key(&column)
    }

    pub fn columns(&self) -> impl Iterator<Item = NumericColumn> + '_ {
        self.scalers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.scalers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scalers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_population_statistics() {
        let scaler = StandardScaler::fit(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(scaler.mean, 5.0);
        assert_eq!(scaler.std, 2.0);
        assert_eq!(scaler.transform(5.0), 0.0);
        assert_eq!(scaler.transform(9.0), 2.0);
        assert_eq!(scaler.transform(1.0), -2.0);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let scaler = StandardScaler::fit(&[3.0, 3.0, 3.0]).unwrap();
        assert_eq!(scaler.std, 0.0);
        assert_eq!(scaler.transform(3.0), 0.0);
        assert_eq!(scaler.transform(100.0), 0.0);
    }

    #[test]
    fn test_fit_ignores_non_finite() {
        let scaler = StandardScaler::fit(&[1.0, f64::NAN, 3.0]).unwrap();
        assert_eq!(scaler.mean, 2.0);
        assert!(StandardScaler::fit(&[f64::NAN]).is_err());
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_registry_unknown_column() {
        let mut registry = NumericScalerRegistry::new();
        registry.fit(NumericColumn::Rating, &[1.0, 5.0]).unwrap();

        assert_eq!(registry.transform(NumericColumn::Rating, 3.0).unwrap(), 0.0);
        assert!(matches!(
            registry.transform(NumericColumn::Views, 3.0),
            Err(AiCoreError::UnknownColumn(_))
        ));
    }
}
