//! Coach AI core: the feature pipeline shared by training and serving
//!
//! Turns raw educational Q&A records into fixed-length feature vectors and
//! persists everything needed to reproduce that mapping in another process.
//!
//! Modules:
//! - `record`: Raw records and the canonical column vocabulary
//! - `text`: Text normalization and text-derived scalar features
//! - `encoders`: Categorical encoders with local-only vocabulary growth
//! - `scalers`: Per-column standard scalers
//! - `tfidf`: TF-IDF vectorizer over unigrams and bigrams
//! - `features`: Feature schema and assembler
//! - `target`: Difficulty categories and the engagement score
//! - `preprocessing`: Fitted transformers as one persisted unit
//! - `classifier`: Classifier trait and the bundled softmax model
//! - `bundle`: Classifier, artifacts and schema loaded together
//! - `store`: On-disk bundle layout, manifest and integrity checks
//! - `config`: Pipeline configuration

pub mod bundle;
pub mod classifier;
pub mod config;
pub mod encoders;
pub mod errors;
pub mod features;
pub mod preprocessing;
pub mod record;
pub mod scalers;
pub mod stopwords;
pub mod store;
pub mod target;
pub mod text;
pub mod tfidf;

pub use bundle::{BundleMetadata, BundleSource, ModelBundle, Prediction};
pub use classifier::{Classifier, SoftmaxClassifier};
pub use config::{PipelineConfig, QualityFilterConfig, SplitConfig};
pub use encoders::{CategoricalEncoder, CategoricalEncoderRegistry, Encoded, DEFAULT_EXTENSION_LIMIT};
pub use errors::{AiCoreError, Result};
pub use features::{AssembledFeatures, FeatureAssembler, FeatureSchema};
pub use preprocessing::PreprocessingArtifacts;
pub use record::{CategoricalColumn, NumericColumn, Record, UNKNOWN_CATEGORY};
pub use scalers::{NumericScalerRegistry, StandardScaler};
pub use store::{new_bundle_id, validate_bundle_names, ArtifactStore, BundleManifest, SavedBundle};
pub use target::{
    category, derive_category, engagement_category, engagement_scores, ordinal_level,
    DifficultyCategory, EngagementCategory,
};
pub use text::{clean_text, text_statistics, TextStatistics};
pub use tfidf::{TfidfConfig, TfidfVectorizer};

/// Crate version string recorded in bundle metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
