//! Coach AI inference service
//!
//! Loads one model bundle at startup and serves difficulty predictions over
//! HTTP:
//! - `GET /health`
//! - `POST /coach/predict`
//! - `GET /metrics` (Prometheus text)

pub mod api;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod service;
pub mod types;

pub use api::routes;
pub use config::{ConfigManager, Environment, ServiceConfig};
pub use errors::ServiceError;
pub use metrics::{BundleGauges, MetricsCollector, MetricsSnapshot};
pub use service::InferenceService;
pub use types::{ErrorResponse, HealthResponse, PredictRequest, PredictResponse};

/// Service version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
