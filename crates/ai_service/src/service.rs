//! Inference over one loaded model bundle

use coach_ai_core::{ArtifactStore, ModelBundle};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::metrics::{render_prometheus, BundleGauges, MetricsCollector};
use crate::types::{HealthResponse, PredictRequest, PredictResponse};
use crate::ServiceError;

/// Process-wide inference state
///
/// The bundle is loaded once and shared read-only; the only mutation on the
/// request path is encoder vocabulary extension, which the core serializes
/// per encoder.
#[derive(Debug, Clone)]
pub struct InferenceService {
    bundle: Arc<ModelBundle>,
    metrics: MetricsCollector,
}

impl InferenceService {
    /// Serve `bundle` with the encoders' default extension cap
    pub fn new(bundle: ModelBundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
            metrics: MetricsCollector::new(),
        }
    }

    /// Load the newest bundle from the configured directories
    pub fn load(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let store = ArtifactStore::new(&config.model_dir, &config.artifacts_dir);
        let mut bundle = store.load_latest(config.strict_bundle)?;
        bundle.set_extension_limit(config.max_vocabulary_extensions);

        info!(
            bundle_id = %bundle.bundle_id(),
            model = %bundle.source.model_path.display(),
            features = bundle.schema().len(),
            max_vocabulary_extensions = config.max_vocabulary_extensions,
            "Loaded model bundle"
        );
        if bundle.source.mismatched {
            warn!(
                bundle_id = %bundle.bundle_id(),
                "Serving a bundle assembled from files with different bundle ids"
            );
        }
        Ok(Self::new(bundle))
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, ServiceError> {
        if let Err(err) = request.validate() {
            self.metrics.record_client_error();
            warn!("Rejected prediction request: {}", err);
            return Err(err);
        }

        let started = Instant::now();
        let record = request.to_record();
        match self.bundle.predict(&record) {
            Ok(prediction) => {
                self.metrics
                    .record_prediction(started.elapsed().as_micros() as u64);
                Ok(prediction.into())
            }
            Err(err) => {
                self.metrics.record_internal_error();
                error!("Prediction failed: {}", err);
                Err(ServiceError::Model(err.to_string()))
            }
        }
    }

    pub fn health(&self) -> HealthResponse {
        self.metrics.record_endpoint("health");
        let model = self
            .bundle
            .source
            .model_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        HealthResponse {
            status: "ok".to_string(),
            model,
            bundle_id: self.bundle.bundle_id().to_string(),
            features: self.bundle.schema().len(),
            bundle_mismatch: self.bundle.source.mismatched,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Prometheus exposition text
    pub fn render_metrics(&self) -> String {
        self.metrics.record_endpoint("metrics");
        let assembler = self.bundle.assembler();
        let gauges = BundleGauges {
            bundle_id: self.bundle.bundle_id().to_string(),
            feature_count: self.bundle.schema().len(),
            missing_feature_total: assembler.missing_feature_total(),
            nonfinite_feature_total: assembler.nonfinite_feature_total(),
            vocabulary_extensions: assembler.vocabulary_extensions(),
            vocabulary_overflows: assembler.vocabulary_overflows(),
            bundle_mismatch: self.bundle.source.mismatched,
        };
        render_prometheus(&self.metrics.get_snapshot(), &gauges)
    }
}
