//! Request counters and Prometheus text rendering

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters shared by every request handler
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    pub total_requests: Arc<AtomicU64>,
    pub predictions: Arc<AtomicU64>,
    pub client_errors: Arc<AtomicU64>,
    pub internal_errors: Arc<AtomicU64>,
    pub health_requests: Arc<AtomicU64>,
    pub metrics_requests: Arc<AtomicU64>,
    pub prediction_duration_us: Arc<AtomicU64>,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            total_requests: Arc::new(AtomicU64::new(0)),
            predictions: Arc::new(AtomicU64::new(0)),
            client_errors: Arc::new(AtomicU64::new(0)),
            internal_errors: Arc::new(AtomicU64::new(0)),
            health_requests: Arc::new(AtomicU64::new(0)),
            metrics_requests: Arc::new(AtomicU64::new(0)),
            prediction_duration_us: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_prediction(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.predictions.fetch_add(1, Ordering::Relaxed);
        self.prediction_duration_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn record_client_error(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_internal_error(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a request to a non-prediction endpoint
    pub fn record_endpoint(&self, endpoint: &str) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        match endpoint {
            "health" => {
                self.health_requests.fetch_add(1, Ordering::Relaxed);
            }
            "metrics" => {
                self.metrics_requests.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let duration_us = self.prediction_duration_us.load(Ordering::Relaxed);
        let avg_prediction_ms = if predictions > 0 {
            duration_us as f64 / predictions as f64 / 1000.0
        } else {
            0.0
        };

        MetricsSnapshot {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            predictions,
            client_errors: self.client_errors.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            health_requests: self.health_requests.load(Ordering::Relaxed),
            metrics_requests: self.metrics_requests.load(Ordering::Relaxed),
            avg_prediction_ms,
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub predictions: u64,
    pub client_errors: u64,
    pub internal_errors: u64,
    pub health_requests: u64,
    pub metrics_requests: u64,
    pub avg_prediction_ms: f64,
}

/// Bundle-level gauges reported next to the request counters
#[derive(Debug, Clone, PartialEq)]
pub struct BundleGauges {
    pub bundle_id: String,
    pub feature_count: usize,
    pub missing_feature_total: u64,
    pub nonfinite_feature_total: u64,
    pub vocabulary_extensions: usize,
    pub vocabulary_overflows: u64,
    pub bundle_mismatch: bool,
}

pub fn render_prometheus(snapshot: &MetricsSnapshot, bundle: &BundleGauges) -> String {
    let mut output = String::new();

    metric(
        &mut output,
        "coach_uptime_seconds",
        "Uptime of the inference service in seconds",
        "gauge",
        snapshot.uptime_seconds,
    );
    metric(
        &mut output,
        "coach_requests_total",
        "Requests handled by the inference service",
        "counter",
        snapshot.total_requests,
    );
    metric(
        &mut output,
        "coach_predictions_total",
        "Successful predictions",
        "counter",
        snapshot.predictions,
    );
    metric(
        &mut output,
        "coach_client_errors_total",
        "Requests rejected as invalid input",
        "counter",
        snapshot.client_errors,
    );
    metric(
        &mut output,
        "coach_internal_errors_total",
        "Requests failed by the model",
        "counter",
        snapshot.internal_errors,
    );
    metric(
        &mut output,
        "coach_avg_prediction_ms",
        "Average prediction latency in milliseconds",
        "gauge",
        snapshot.avg_prediction_ms,
    );
    metric(
        &mut output,
        "coach_missing_features_total",
        "Declared features the assembler could not compute",
        "counter",
        bundle.missing_feature_total,
    );
    metric(
        &mut output,
        "coach_nonfinite_features_total",
        "Computed feature values replaced by 0.0 for being NaN or infinite",
        "counter",
        bundle.nonfinite_feature_total,
    );
    metric(
        &mut output,
        "coach_vocabulary_extensions",
        "Categories added to encoder vocabularies since startup",
        "gauge",
        bundle.vocabulary_extensions,
    );
    metric(
        &mut output,
        "coach_vocabulary_overflow_total",
        "Unseen categories encoded as overflow after the extension cap",
        "counter",
        bundle.vocabulary_overflows,
    );
    metric(
        &mut output,
        "coach_bundle_features",
        "Length of the loaded feature schema",
        "gauge",
        bundle.feature_count,
    );

    let _ = writeln!(
        output,
        "# HELP coach_bundle_mismatch Loaded artifacts carry different bundle ids (1=yes)"
    );
    let _ = writeln!(output, "# TYPE coach_bundle_mismatch gauge");
    let _ = writeln!(
        output,
        "coach_bundle_mismatch{{bundle_id=\"{}\"}} {}",
        bundle.bundle_id,
        u8::from(bundle.bundle_mismatch)
    );

    output
}

fn metric(output: &mut String, name: &str, help: &str, kind: &str, value: impl std::fmt::Display) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {kind}");
    let _ = writeln!(output, "{name} {value}");
}
