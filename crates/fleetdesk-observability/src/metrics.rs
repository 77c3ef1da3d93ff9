//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for the Fleetdesk client:
//! - API request counts and latency by method and resource
//! - Query cache hits, misses, de-duplicated joins and invalidations
//! - Mutation outcomes

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector for the Fleetdesk client
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    // API metrics
    /// Total API requests sent
    pub api_requests_total: CounterVec,
    /// Failed API requests
    pub api_requests_failure: CounterVec,
    /// API request duration
    pub api_request_duration_seconds: HistogramVec,

    // Cache metrics
    /// Reads answered from a fresh cache entry
    pub cache_hits: CounterVec,
    /// Reads that started a fetch
    pub cache_misses: CounterVec,
    /// Reads that joined a fetch already in flight
    pub cache_joins: CounterVec,
    /// Entries marked stale
    pub cache_invalidations: CounterVec,

    // Mutation metrics
    /// Mutations by outcome
    pub mutations_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let api_requests_total = CounterVec::new(
            Opts::new("fleetdesk_api_requests_total", "Total number of API requests"),
            &["method", "resource"],
        )?;

        let api_requests_failure = CounterVec::new(
            Opts::new(
                "fleetdesk_api_requests_failure_total",
                "Total number of failed API requests",
            ),
            &["method", "resource", "status"],
        )?;

        let api_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "fleetdesk_api_request_duration_seconds",
                "API request duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["method", "resource"],
        )?;

        let cache_hits = CounterVec::new(
            Opts::new("fleetdesk_cache_hits_total", "Reads served from fresh cache entries"),
            &["resource"],
        )?;

        let cache_misses = CounterVec::new(
            Opts::new("fleetdesk_cache_misses_total", "Reads that triggered a fetch"),
            &["resource"],
        )?;

        let cache_joins = CounterVec::new(
            Opts::new(
                "fleetdesk_cache_joins_total",
                "Reads that joined an in-flight fetch",
            ),
            &["resource"],
        )?;

        let cache_invalidations = CounterVec::new(
            Opts::new(
                "fleetdesk_cache_invalidations_total",
                "Cache entries marked stale",
            ),
            &["resource"],
        )?;

        let mutations_total = CounterVec::new(
            Opts::new("fleetdesk_mutations_total", "Mutations by kind and outcome"),
            &["resource", "kind", "outcome"],
        )?;

        registry.register(Box::new(api_requests_total.clone()))?;
        registry.register(Box::new(api_requests_failure.clone()))?;
        registry.register(Box::new(api_request_duration_seconds.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(cache_joins.clone()))?;
        registry.register(Box::new(cache_invalidations.clone()))?;
        registry.register(Box::new(mutations_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            api_requests_total,
            api_requests_failure,
            api_request_duration_seconds,
            cache_hits,
            cache_misses,
            cache_joins,
            cache_invalidations,
            mutations_total,
        })
    }

    /// Record a completed API request
    pub fn record_api_request(
        &self,
        method: &str,
        resource: &str,
        duration_secs: f64,
        failure_status: Option<u16>,
    ) {
        self.api_requests_total
            .with_label_values(&[method, resource])
            .inc();
        self.api_request_duration_seconds
            .with_label_values(&[method, resource])
            .observe(duration_secs);

        if let Some(status) = failure_status {
            let status = status.to_string();
            self.api_requests_failure
                .with_label_values(&[method, resource, status.as_str()])
                .inc();
        }
    }

    pub fn record_cache_hit(&self, resource: &str) {
        self.cache_hits.with_label_values(&[resource]).inc();
    }

    pub fn record_cache_miss(&self, resource: &str) {
        self.cache_misses.with_label_values(&[resource]).inc();
    }

    pub fn record_cache_join(&self, resource: &str) {
        self.cache_joins.with_label_values(&[resource]).inc();
    }

    pub fn record_invalidation(&self, resource: &str, count: usize) {
        self.cache_invalidations
            .with_label_values(&[resource])
            .inc_by(count as f64);
    }

    pub fn record_mutation(&self, resource: &str, kind: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.mutations_total
            .with_label_values(&[resource, kind, outcome])
            .inc();
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_api_request() {
        let metrics = Metrics::new().unwrap();
        metrics.record_api_request("GET", "trips", 0.12, None);
        metrics.record_api_request("POST", "trips", 0.3, Some(422));

        assert_eq!(
            metrics
                .api_requests_total
                .with_label_values(&["GET", "trips"])
                .get(),
            1.0
        );
        assert_eq!(
            metrics
                .api_requests_failure
                .with_label_values(&["POST", "trips", "422"])
                .get(),
            1.0
        );
    }

    #[test]
    fn test_cache_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record_cache_miss("invoice");
        metrics.record_cache_hit("invoice");
        metrics.record_cache_hit("invoice");
        metrics.record_invalidation("invoice", 3);

        assert_eq!(metrics.cache_hits.with_label_values(&["invoice"]).get(), 2.0);
        assert_eq!(metrics.cache_misses.with_label_values(&["invoice"]).get(), 1.0);
        assert_eq!(
            metrics
                .cache_invalidations
                .with_label_values(&["invoice"])
                .get(),
            3.0
        );
    }

    #[test]
    fn test_gather_text() {
        let metrics = Metrics::new().unwrap();
        metrics.record_mutation("trip", "create", true);
        let text = metrics.gather_text().unwrap();
        assert!(text.contains("fleetdesk_mutations_total"));
    }
}
