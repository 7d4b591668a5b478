//! Seeded sample data for the three content sources
//!
//! Stands in for real scraping: each source produces records with the
//! fields that source actually carries, so the downstream pipeline sees the
//! same sparsity it would see on real data.

use coach_ai_core::Record;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::deterministic::LcgRng;
use crate::errors::Result;

/// Content sources the generator can imitate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    KhanAcademy,
    MitOpenCourseware,
    StackExchange,
}

impl Source {
    pub const ALL: [Source; 3] = [
        Source::KhanAcademy,
        Source::MitOpenCourseware,
        Source::StackExchange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Source::KhanAcademy => "khan_academy",
            Source::MitOpenCourseware => "mit_opencourseware",
            Source::StackExchange => "stack_exchange",
        }
    }
}

const KHAN_SUBJECTS: [&str; 4] = ["math", "science", "computing", "arts-humanities"];
const KHAN_DIFFICULTIES: [&str; 3] = ["beginner", "intermediate", "advanced"];
const SE_SITES: [&str; 3] = ["math", "stackoverflow", "cseducators"];

/// Deterministic record generator
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    rng: LcgRng,
}

impl SampleGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: LcgRng::new(seed),
        }
    }

    pub fn generate(&mut self, source: Source, count: usize) -> Vec<Record> {
        (0..count)
            .map(|_| match source {
                Source::KhanAcademy => self.khan_academy(),
                Source::MitOpenCourseware => self.mit_opencourseware(),
                Source::StackExchange => self.stack_exchange(),
            })
            .collect()
    }

    fn pick(&mut self, items: &[&'static str]) -> &'static str {
        self.rng.choose(items).copied().unwrap_or("unknown")
    }

    fn int(&mut self, lo: i64, hi: i64) -> i64 {
        self.rng.next_in(lo, hi)
    }

    fn khan_academy(&mut self) -> Record {
        let subject = self.pick(&KHAN_SUBJECTS);
        let difficulty = self.pick(&KHAN_DIFFICULTIES);

        let (topic, question, answer) = match subject {
            "math" => match self.pick(&["algebra", "geometry", "calculus", "statistics"]) {
                "algebra" => {
                    let (a, b) = (self.int(1, 10), self.int(1, 10));
                    let c = self.int(20, 50);
                    (
                        "algebra",
                        format!("Solve for x: {a}x + {b} = {c}"),
                        format!("Subtract {b} from both sides and divide by {a} to find x."),
                    )
                }
                "geometry" => {
                    let shape = self.pick(&["rectangle", "triangle", "circle"]);
                    let size = self.int(1, 20);
                    (
                        "geometry",
                        format!("What is the area of a {shape} with a side or radius of {size}?"),
                        format!("Apply the area formula for a {shape} using {size} as the measure."),
                    )
                }
                "calculus" => {
                    let (k, p) = (self.int(1, 5), self.int(2, 4));
                    (
                        "calculus",
                        format!("Find the derivative of f(x) = {k}x^{p}"),
                        format!("Using the power rule, f'(x) = {}x^{}.", k * p, p - 1),
                    )
                }
                _ => {
                    let n = self.int(5, 30);
                    (
                        "statistics",
                        format!("How do you compute the mean of {n} observations?"),
                        "Add all observations together and divide by how many there are.".to_string(),
                    )
                }
            },
            "computing" => match self.pick(&["programming", "algorithms", "data-structures"]) {
                "programming" => {
                    let (x, y) = (self.int(1, 10), self.int(1, 10));
                    (
                        "programming",
                        format!("What does this Python code print: x = {x}; y = {y}; print(x + y)?"),
                        format!("The program prints {} to standard output.", x + y),
                    )
                }
                "algorithms" => {
                    let algorithm = self.pick(&["bubble sort", "binary search", "merge sort"]);
                    (
                        "algorithms",
                        format!("What is the time complexity of {algorithm}?"),
                        format!("The complexity of {algorithm} depends on how it divides the input."),
                    )
                }
                _ => {
                    let structure = self.pick(&["queue", "stack", "priority queue"]);
                    (
                        "data-structures",
                        format!("Which data structure is best for implementing a {structure}?"),
                        "A linked list or a binary heap, depending on the required operations.".to_string(),
                    )
                }
            },
            _ => {
                let concept = self.pick(&["photosynthesis", "gravity", "democracy", "renaissance"]);
                let theme = self.pick(&[
                    "energy conversion",
                    "fundamental forces",
                    "political systems",
                    "cultural movements",
                ]);
                (
                    "general",
                    format!("Explain the concept of {concept}."),
                    format!("This concept involves {theme} and its effects over time."),
                )
            }
        };

        Record {
            question: Some(question),
            answer: Some(answer),
            subject: Some(subject.to_string()),
            topic: Some(topic.to_string()),
            difficulty: Some(difficulty.to_string()),
            source: Some(Source::KhanAcademy.name().to_string()),
            rating: Some((35.0 + self.rng.next_f64() * 15.0).round() / 10.0),
            views: Some(self.int(100, 10_000) as f64),
            ..Default::default()
        }
    }

    fn mit_opencourseware(&mut self) -> Record {
        let department = self.pick(&[
            "mathematics",
            "electrical-engineering",
            "computer-science",
            "physics",
        ]);

        let (question, answer) = match department {
            "mathematics" => {
                let (a, b) = (self.int(1, 5), self.int(1, 5));
                (
                    format!("Find the eigenvalues of the matrix [[{a}, {b}], [{b}, {a}]]"),
                    format!("The eigenvalues are {} and {}.", a + b, a - b),
                )
            }
            "computer-science" => {
                let algorithm = self.pick(&["Dijkstra", "QuickSort", "Binary Search"]);
                let summary = self.pick(&[
                    "finds shortest paths",
                    "sorts efficiently",
                    "searches in O(log n)",
                ]);
                (
                    format!("Describe the {algorithm} algorithm."),
                    format!("This algorithm {summary} by repeatedly narrowing the problem."),
                )
            }
            _ => {
                let principle = self.pick(&[
                    "conservation of energy",
                    "Ohm's law",
                    "Newton's laws",
                ]);
                (
                    format!("Explain the principle of {principle}."),
                    format!("The principle of {principle} relates measurable quantities in a system."),
                )
            }
        };

        Record {
            question: Some(question),
            answer: Some(answer),
            source: Some(Source::MitOpenCourseware.name().to_string()),
            year: Some(self.int(2019, 2023) as f64),
            enrollment: Some(self.int(50, 500) as f64),
            ..Default::default()
        }
    }

    fn stack_exchange(&mut self) -> Record {
        let site = self.pick(&SE_SITES);

        let (question, answer) = match site {
            "math" => {
                let fact = self.pick(&["pi is irrational", "0! = 1", "the square root of 2 is irrational"]);
                let reason = self.pick(&[
                    "proof by contradiction",
                    "the definition of factorial",
                    "unique prime factorization",
                ]);
                (
                    format!("Can someone explain why {fact}?"),
                    format!("This follows from {reason}."),
                )
            }
            "stackoverflow" => {
                let language = self.pick(&["Python", "Java", "JavaScript", "C++"]);
                let error = self.pick(&["NullPointerException", "IndexError", "TypeError"]);
                (
                    format!("Why is my {language} code throwing a {error}?"),
                    format!("The {error} usually means a value is not what the code expects."),
                )
            }
            _ => {
                let topic = self.pick(&["recursion", "pointers", "object-oriented programming"]);
                let method = self.pick(&["analogies", "visual aids", "step-by-step examples"]);
                (
                    format!("How can I effectively teach {topic} to beginners?"),
                    format!("Use {method} and let students practice on small problems."),
                )
            }
        };

        let votes = self.int(-2, 50);
        let difficulty = if votes < 0 {
            "hard"
        } else if votes < 10 {
            "medium"
        } else {
            "easy"
        };

        Record {
            question: Some(question),
            answer: Some(answer),
            difficulty: Some(difficulty.to_string()),
            source: Some(Source::StackExchange.name().to_string()),
            votes: Some(votes as f64),
            answers_count: Some(self.int(0, 10) as f64),
            views: Some(self.int(10, 10_000) as f64),
            reputation: Some(self.int(1, 10_000) as f64),
            ..Default::default()
        }
    }
}

/// Generate `per_source` records for every source and write one
/// `<source>_raw_<timestamp>.json` file each.
pub fn write_raw_datasets(
    output_dir: &Path,
    per_source: usize,
    seed: u64,
    timestamp: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut generator = SampleGenerator::new(seed);

    let mut written = Vec::new();
    for source in Source::ALL {
        let records = generator.generate(source, per_source);
        let path = output_dir.join(format!("{}_raw_{timestamp}.json", source.name()));
        std::fs::write(&path, serde_json::to_vec_pretty(&records)?)?;
        info!(source = source.name(), records = records.len(), path = %path.display(), "wrote raw dataset");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_seeded() {
        let a = SampleGenerator::new(42).generate(Source::KhanAcademy, 20);
        let b = SampleGenerator::new(42).generate(Source::KhanAcademy, 20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_source_field_sparsity() {
        let mut generator = SampleGenerator::new(1);

        for record in generator.generate(Source::KhanAcademy, 10) {
            assert!(record.subject.is_some());
            let rating = record.rating.unwrap();
            assert!((3.5..=5.0).contains(&rating));
            assert!(record.votes.is_none());
        }
        for record in generator.generate(Source::MitOpenCourseware, 10) {
            assert!(record.subject.is_none());
            assert!(record.enrollment.is_some());
        }
        for record in generator.generate(Source::StackExchange, 10) {
            let votes = record.votes.unwrap();
            let expected = if votes < 0.0 { "hard" } else if votes < 10.0 { "medium" } else { "easy" };
            assert_eq!(record.difficulty.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_write_raw_datasets() {
        let temp = tempfile::tempdir().unwrap();
        let paths = write_raw_datasets(temp.path(), 5, 42, "20240101_000000").unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("khan_academy_raw_20240101_000000.json"));

        let records: Vec<Record> = serde_json::from_slice(&std::fs::read(&paths[2]).unwrap()).unwrap();
        assert_eq!(records.len(), 5);
    }
}
