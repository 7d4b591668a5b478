//! Categorical encoders
//!
//! Each categorical column owns an encoder mapping category strings to
//! stable integer codes. Codes assigned at fit time never change.
//!
//! Unseen categories never fail: they are appended to a process-local
//! extension vocabulary and receive the next unused code. Extensions are
//! guarded by a per-encoder lock so concurrent requests agree on a single
//! code per category, and they are never written back into the persisted
//! artifact. Two serving processes may therefore assign different codes to
//! the same unseen category.
//!
//! Extensions are capped per encoder. Once the cap is reached every further
//! unseen category maps to one shared overflow code, `classes + limit`,
//! which no fitted or extended category can hold.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::errors::{AiCoreError, Result};
use crate::record::{CategoricalColumn, UNKNOWN_CATEGORY};

/// Persisted encoder state: fit-time classes in code order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderState {
    pub classes: Vec<String>,
}

/// Default cap on categories appended per encoder
pub const DEFAULT_EXTENSION_LIMIT: usize = 1024;

#[derive(Debug, Default)]
struct LocalVocabulary {
    codes: HashMap<String, u32>,
    order: Vec<String>,
}

/// Result of encoding one value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded {
    /// Fitted, or appended by an earlier call
    Known(u32),
    /// Appended to the local vocabulary by this call
    Extended(u32),
    /// Local vocabulary is full; the shared overflow code
    Overflow(u32),
}

impl Encoded {
    pub fn code(self) -> u32 {
        match self {
            Encoded::Known(code) | Encoded::Extended(code) | Encoded::Overflow(code) => code,
        }
    }
}

/// Encoder for a single categorical column
#[derive(Debug)]
pub struct CategoricalEncoder {
    classes: Vec<String>,
    codes: HashMap<String, u32>,
    local: RwLock<LocalVocabulary>,
    extension_limit: usize,
    overflow_total: AtomicU64,
}

impl CategoricalEncoder {
    /// Fit on every observed value. Codes follow sorted-unique order.
    pub fn fit<I, S>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        if distinct.is_empty() {
            return Err(AiCoreError::FitFailed(
                "categorical encoder needs at least one value".to_string(),
            ));
        }

        Ok(Self::from_state(EncoderState {
            classes: distinct.into_iter().collect(),
        }))
    }

    pub fn from_state(state: EncoderState) -> Self {
        let codes = state
            .classes
            .iter()
            .enumerate()
            .map(|(code, class)| (class.clone(), code as u32))
            .collect();

        Self {
            classes: state.classes,
            codes,
            local: RwLock::new(LocalVocabulary::default()),
            extension_limit: DEFAULT_EXTENSION_LIMIT,
            overflow_total: AtomicU64::new(0),
        }
    }

    /// Cap local growth. Never drops below the extensions already assigned.
    pub fn set_extension_limit(&mut self, limit: usize) {
        self.extension_limit = limit.max(self.local.get_mut().order.len());
    }

    pub fn extension_limit(&self) -> usize {
        self.extension_limit
    }

    /// Code shared by every category that arrives after the cap is reached
    pub fn overflow_code(&self) -> u32 {
        (self.classes.len() + self.extension_limit) as u32
    }

    /// Fit-time state only. Local extensions are deliberately excluded.
    pub fn state(&self) -> EncoderState {
        EncoderState {
            classes: self.classes.clone(),
        }
    }

    /// Fit-time classes in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code assigned at fit time, if any
    pub fn fitted_code(&self, value: &str) -> Option<u32> {
        self.codes.get(value).copied()
    }

    /// Encode a value, extending the local vocabulary on a miss while
    /// there is room.
    pub fn encode(&self, value: &str) -> Encoded {
        if let Some(code) = self.fitted_code(value) {
            return Encoded::Known(code);
        }

        {
            let local = self.local.read();
            if let Some(code) = local.codes.get(value) {
                return Encoded::Known(*code);
            }
            if local.order.len() >= self.extension_limit {
                return self.overflow();
            }
        }

        let mut local = self.local.write();
        // Another writer may have assigned it between the read and write lock.
        if let Some(code) = local.codes.get(value) {
            return Encoded::Known(*code);
        }
        if local.order.len() >= self.extension_limit {
            return self.overflow();
        }

        let code = (self.classes.len() + local.order.len()) as u32;
        local.codes.insert(value.to_string(), code);
        local.order.push(value.to_string());
        Encoded::Extended(code)
    }

    fn overflow(&self) -> Encoded {
        self.overflow_total.fetch_add(1, Ordering::Relaxed);
        Encoded::Overflow(self.overflow_code())
    }

    /// Number of categories appended since load
    pub fn extension_count(&self) -> usize {
        self.local.read().order.len()
    }

    /// Values encoded as the overflow code since load
    pub fn overflow_count(&self) -> u64 {
        self.overflow_total.load(Ordering::Relaxed)
    }

    /// Total codes handed out so far (fit-time plus local)
    pub fn len(&self) -> usize {
        self.classes.len() + self.extension_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One encoder per categorical column
#[derive(Debug, Default)]
pub struct CategoricalEncoderRegistry {
    encoders: BTreeMap<CategoricalColumn, CategoricalEncoder>,
}

impl CategoricalEncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit (or refit) the encoder for `column`. Training only.
    pub fn fit<I, S>(&mut self, column: CategoricalColumn, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let encoder = CategoricalEncoder::fit(values)?;
        debug!(column = %column, classes = encoder.classes().len(), "fitted categorical encoder");
        self.encoders.insert(column, encoder);
        Ok(())
    }

    /// Encode `value` for `column`; a missing value encodes as `"unknown"`.
    pub fn encode(&self, column: CategoricalColumn, value: Option<&str>) -> Result<u32> {
        let encoder = self
            .encoders
            .get(&column)
            .ok_or_else(|| AiCoreError::UnknownColumn(column.name().to_string()))?;

        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => UNKNOWN_CATEGORY,
        };

        let encoded = encoder.encode(value);
        match encoded {
            Encoded::Known(_) => {}
            Encoded::Extended(code) => warn!(
                column = %column,
                category = value,
                code,
                "unseen category; extended local vocabulary (not persisted)"
            ),
            Encoded::Overflow(code) => warn!(
                column = %column,
                category = value,
                code,
                limit = encoder.extension_limit(),
                "local vocabulary full; encoded as overflow"
            ),
        }
        Ok(encoded.code())
    }

    /// Apply one extension cap to every encoder
    pub fn set_extension_limit(&mut self, limit: usize) {
        for encoder in self.encoders.values_mut() {
            encoder.set_extension_limit(limit);
        }
    }

    pub fn get(&self, column: CategoricalColumn) -> Option<&CategoricalEncoder> {
        self.encoders.get(&column)
    }

    pub fn contains(&self, column: CategoricalColumn) -> bool {
        self.encoders.contains_key(&column)
    }

    /// Fitted columns in canonical order
    pub fn columns(&self) -> impl Iterator<Item = CategoricalColumn> + '_ {
        self.encoders.keys().copied()
    }

    /// Total local extensions across every column
    pub fn extension_count(&self) -> usize {
        self.encoders.values().map(|e| e.extension_count()).sum()
    }

    /// Total overflow encodings across every column
    pub fn overflow_count(&self) -> u64 {
        self.encoders.values().map(|e| e.overflow_count()).sum()
    }

    pub fn state(&self) -> BTreeMap<CategoricalColumn, EncoderState> {
        self.encoders
            .iter()
            .map(|(column, encoder)| (*column, encoder.state()))
            .collect()
    }

    pub fn from_state(state: BTreeMap<CategoricalColumn, EncoderState>) -> Self {
        Self {
            encoders: state
                .into_iter()
                .map(|(column, state)| (column, CategoricalEncoder::from_state(state)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_fit_assigns_sorted_codes() {
        let encoder = CategoricalEncoder::fit(["science", "math", "computing", "math"]).unwrap();
        assert_eq!(encoder.classes(), &["computing", "math", "science"]);
        assert_eq!(encoder.fitted_code("computing"), Some(0));
        assert_eq!(encoder.fitted_code("math"), Some(1));
        assert_eq!(encoder.fitted_code("science"), Some(2));
    }

    #[test]
    fn test_fit_rejects_empty_input() {
        let empty: Vec<&str> = Vec::new();
        assert!(CategoricalEncoder::fit(empty).is_err());
    }

    #[test]
    fn test_unseen_category_gets_next_unused_code() {
        let encoder = CategoricalEncoder::fit(["a", "b"]).unwrap();

        assert_eq!(encoder.encode("c"), Encoded::Extended(2));

        // Stable on repeat, no reuse for the next one
        assert_eq!(encoder.encode("c"), Encoded::Known(2));
        assert_eq!(encoder.encode("d"), Encoded::Extended(3));
        assert_eq!(encoder.encode("a"), Encoded::Known(0));
        assert_eq!(encoder.extension_count(), 2);
    }

    #[test]
    fn test_extensions_are_not_persisted() {
        let encoder = CategoricalEncoder::fit(["a", "b"]).unwrap();
        encoder.encode("new");

        let state = encoder.state();
        assert_eq!(state.classes, vec!["a".to_string(), "b".to_string()]);

        let reloaded = CategoricalEncoder::from_state(state);
        assert_eq!(reloaded.extension_count(), 0);
        assert_eq!(reloaded.fitted_code("new"), None);
    }

    #[test]
    fn test_registry_missing_value_encodes_unknown() {
        let mut registry = CategoricalEncoderRegistry::new();
        registry
            .fit(CategoricalColumn::Subject, ["math", "unknown"])
            .unwrap();

        let code = registry.encode(CategoricalColumn::Subject, None).unwrap();
        assert_eq!(code, 1);
        assert_eq!(registry.encode(CategoricalColumn::Subject, Some("")).unwrap(), 1);
    }

    #[test]
    fn test_registry_unknown_column() {
        let registry = CategoricalEncoderRegistry::new();
        assert!(matches!(
            registry.encode(CategoricalColumn::Topic, Some("x")),
            Err(AiCoreError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_concurrent_extension_assigns_single_code() {
        let encoder = Arc::new(CategoricalEncoder::fit(["a"]).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let encoder = Arc::clone(&encoder);
                std::thread::spawn(move || {
                    ["x", "y", "z"]
                        .iter()
                        .map(|v| (v.to_string(), encoder.encode(v).code()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen: HashMap<String, HashSet<u32>> = HashMap::new();
        for handle in handles {
            for (value, code) in handle.join().unwrap() {
                seen.entry(value).or_default().insert(code);
            }
        }

        assert!(seen.values().all(|codes| codes.len() == 1));
        let mut codes: Vec<u32> = seen.values().flat_map(|c| c.iter().copied()).collect();
        codes.sort_unstable();
        assert_eq!(codes, vec![1, 2, 3]);
        assert_eq!(encoder.extension_count(), 3);
    }

    #[test]
    fn test_overflow_past_extension_limit() {
        let mut encoder = CategoricalEncoder::fit(["a", "b"]).unwrap();
        encoder.set_extension_limit(2);
        assert_eq!(encoder.overflow_code(), 4);

        assert_eq!(encoder.encode("c"), Encoded::Extended(2));
        assert_eq!(encoder.encode("d"), Encoded::Extended(3));
        assert_eq!(encoder.encode("e"), Encoded::Overflow(4));
        assert_eq!(encoder.encode("f"), Encoded::Overflow(4));

        // Earlier extensions and fitted codes are unaffected
        assert_eq!(encoder.encode("c"), Encoded::Known(2));
        assert_eq!(encoder.encode("b"), Encoded::Known(1));
        assert_eq!(encoder.extension_count(), 2);
        assert_eq!(encoder.overflow_count(), 2);
        assert!(encoder.classes().iter().all(|c| encoder.fitted_code(c) != Some(4)));
    }

    #[test]
    fn test_zero_limit_sends_every_unseen_value_to_overflow() {
        let mut registry = CategoricalEncoderRegistry::new();
        registry.fit(CategoricalColumn::Topic, ["algebra", "unknown"]).unwrap();
        registry.set_extension_limit(0);

        let first = registry.encode(CategoricalColumn::Topic, Some("optics")).unwrap();
        let second = registry.encode(CategoricalColumn::Topic, Some("genetics")).unwrap();
        assert_eq!(first, 2);
        assert_eq!(second, 2);
        assert_eq!(registry.extension_count(), 0);
        assert_eq!(registry.overflow_count(), 2);
    }

    #[test]
    fn test_limit_never_drops_below_assigned_extensions() {
        let mut encoder = CategoricalEncoder::fit(["a"]).unwrap();
        encoder.encode("x");
        encoder.encode("y");
        encoder.set_extension_limit(1);
        assert_eq!(encoder.extension_limit(), 2);
        assert_eq!(encoder.overflow_code(), 3);
        assert_eq!(encoder.encode("y"), Encoded::Known(2));
    }

    #[test]
    fn test_concurrent_growth_respects_limit() {
        let mut encoder = CategoricalEncoder::fit(["a"]).unwrap();
        encoder.set_extension_limit(5);
        let encoder = Arc::new(encoder);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let encoder = Arc::clone(&encoder);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        encoder.encode(&format!("value-{t}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(encoder.extension_count(), 5);
        assert_eq!(encoder.overflow_count(), 195);
    }
}
