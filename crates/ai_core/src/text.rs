//! Free-text normalization and text-derived scalar features

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

// Word characters, whitespace and the punctuation set kept by the normalizer.
static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^\w\s.!?,;:\-()\[\]{}"'/\\]"#).expect("static regex")
});

static REPEATED_TERMINALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{2,}|!{2,}|\?{2,}").expect("static regex"));

/// Clean a free-text field into its canonical form.
///
/// Order matters:
/// 1. collapse whitespace runs and trim
/// 2. replace characters outside the allow-list with a space
/// 3. collapse repeated terminal punctuation (`!!!` -> `!`)
/// 4. collapse whitespace again
///
/// Missing input yields an empty string.
pub fn clean_text(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let text = collapse_whitespace(text);
    let text = DISALLOWED_CHARS.replace_all(&text, " ");
    let text = REPEATED_TERMINALS.replace_all(&text, |caps: &regex::Captures<'_>| {
        caps[0][..1].to_string()
    });
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUNS.replace_all(text.trim(), " ").trim().to_string()
}

/// Vectorizer input for one record: normalized question and answer joined by a space
pub fn document_text(question: Option<&str>, answer: Option<&str>) -> String {
    format!("{} {}", clean_text(question), clean_text(answer))
}

/// Scalar features derived from already-normalized question/answer text
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextStatistics {
    pub question_length: usize,
    pub question_word_count: usize,
    pub answer_length: usize,
    pub answer_word_count: usize,
    pub question_avg_word_length: f64,
}

impl TextStatistics {
    /// Feature names in emission order
    pub const FEATURE_NAMES: [&'static str; 5] = [
        "question_length",
        "question_word_count",
        "answer_length",
        "answer_word_count",
        "question_avg_word_length",
    ];

    /// Values aligned with [`TextStatistics::FEATURE_NAMES`]
    pub fn values(&self) -> [f64; 5] {
        [
            self.question_length as f64,
            self.question_word_count as f64,
            self.answer_length as f64,
            self.answer_word_count as f64,
            self.question_avg_word_length,
        ]
    }
}

/// Compute lengths and word counts. Lengths count Unicode scalar values.
pub fn text_statistics(question: &str, answer: &str) -> TextStatistics {
    let question_words: Vec<&str> = question.split_whitespace().collect();
    let answer_words = answer.split_whitespace().count();

    let question_avg_word_length = if question_words.is_empty() {
        0.0
    } else {
        let total: usize = question_words.iter().map(|w| w.chars().count()).sum();
        total as f64 / question_words.len() as f64
    };

    TextStatistics {
        question_length: question.chars().count(),
        question_word_count: question_words.len(),
        answer_length: answer.chars().count(),
        answer_word_count: answer_words,
        question_avg_word_length,
    }
}
