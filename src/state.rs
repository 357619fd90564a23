//! # Application State
//!
//! State shared by every request handler. Apart from the metrics counters,
//! nothing here changes after startup: the configuration is fixed, the API
//! key is read once, and the training invoker only hands out job permits.

use crate::auth::ApiKeyStore;
use crate::config::AppConfig;
use crate::training::TrainingInvoker;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// Shared handle passed to every handler through `web::Data`.
///
/// ## Rust Concepts:
/// - **Arc**: cloning the state per worker only bumps reference counts
/// - **Arc<RwLock<AppMetrics>>**: the only mutable part; requests update
///   counters while `/api/v1/metrics` reads a snapshot
/// - **Instant**: `Copy`, so no lock is needed for uptime
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Read-once API key, shared by all workers
    pub api_keys: Arc<ApiKeyStore>,

    pub invoker: TrainingInvoker,

    pub metrics: Arc<RwLock<AppMetrics>>,

    pub start_time: Instant,
}

/// Counters collected across all HTTP requests and training runs.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,

    /// Training runs currently in flight
    pub active_jobs: u32,
    pub training: TrainingMetrics,

    /// Key: endpoint name (e.g., "POST /train")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Outcome counters for training runs.
#[derive(Debug, Default, Clone)]
pub struct TrainingMetrics {
    pub succeeded: u64,
    pub failed: u64,
    pub total_duration_ms: u64,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let api_keys = ApiKeyStore::new(config.auth.key_path());
        let invoker = TrainingInvoker::from_config(&config.training);
        Self {
            config: Arc::new(config),
            api_keys: Arc::new(api_keys),
            invoker,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    // Counters stay usable even if a writer panicked mid-update.
    fn with_metrics<R>(&self, f: impl FnOnce(&mut AppMetrics) -> R) -> R {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut metrics)
    }

    pub fn increment_request_count(&self) {
        self.with_metrics(|m| m.request_count += 1);
    }

    pub fn increment_error_count(&self) {
        self.with_metrics(|m| m.error_count += 1);
    }

    /// Record one finished request for `endpoint`.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        self.with_metrics(|m| {
            let endpoint_metric = m.endpoint_metrics.entry(endpoint.to_string()).or_default();
            endpoint_metric.request_count += 1;
            endpoint_metric.total_duration_ms += duration_ms;
            if is_error {
                endpoint_metric.error_count += 1;
            }
        });
    }

    /// Mark a training run as started. The returned guard marks it finished
    /// when dropped, so abandoned requests are not counted forever.
    pub fn start_job(&self) -> JobGuard {
        self.with_metrics(|m| m.active_jobs += 1);
        JobGuard {
            state: self.clone(),
        }
    }

    pub fn record_training(&self, success: bool, duration_ms: u64) {
        self.with_metrics(|m| {
            if success {
                m.training.succeeded += 1;
            } else {
                m.training.failed += 1;
            }
            m.training.total_duration_ms += duration_ms;
        });
    }

    /// Consistent copy of the metrics, so no lock is held while a response
    /// is serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Decrements the active job counter on drop.
pub struct JobGuard {
    state: AppState,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.state.with_metrics(|m| m.active_jobs = m.active_jobs.saturating_sub(1));
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Fraction of failed requests, 0.0 to 1.0.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl TrainingMetrics {
    pub fn average_duration_ms(&self) -> f64 {
        let runs = self.succeeded + self.failed;
        if runs > 0 {
            self.total_duration_ms as f64 / runs as f64
        } else {
            0.0
        }
    }
}
