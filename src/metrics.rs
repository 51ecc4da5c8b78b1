//! Prometheus metrics for the content service
//!
//! All metrics live on a private [`Registry`] so several service instances
//! (tests in particular) can coexist in one process.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metrics collected by the HTTP handlers
#[derive(Clone)]
pub struct ContentMetrics {
    registry: Registry,

    /// Module responses by environment and HTTP status
    pub module_requests_total: IntCounterVec,

    /// Requests rejected by a rate limiter, by endpoint
    pub rate_limited_total: IntCounterVec,

    /// Files skipped during composition
    pub composition_warnings_total: IntCounter,

    /// Content cache lookups by result (hit/miss)
    pub cache_lookups_total: IntCounterVec,

    /// Handler latency by endpoint
    pub request_duration_seconds: HistogramVec,

    /// Administrative health actions by name
    pub health_actions_total: IntCounterVec,

    /// Responses with a 5xx status on any endpoint
    pub server_errors_total: IntCounter,
}

impl ContentMetrics {
    /// Create metrics registered on a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Create metrics registered on `registry`
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let module_requests_total = IntCounterVec::new(
            Opts::new(
                "content_module_requests_total",
                "Total number of module requests by environment and status",
            ),
            &["environment", "status"],
        )?;
        registry.register(Box::new(module_requests_total.clone()))?;

        let rate_limited_total = IntCounterVec::new(
            Opts::new(
                "content_rate_limited_total",
                "Total number of requests rejected by rate limiting",
            ),
            &["endpoint"], // endpoint: module, manifest
        )?;
        registry.register(Box::new(rate_limited_total.clone()))?;

        let composition_warnings_total = IntCounter::new(
            "content_composition_warnings_total",
            "Total number of files skipped while composing modules",
        )?;
        registry.register(Box::new(composition_warnings_total.clone()))?;

        let cache_lookups_total = IntCounterVec::new(
            Opts::new(
                "content_cache_lookups_total",
                "Total number of content cache lookups by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(cache_lookups_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "content_request_duration_seconds",
                "Duration of content requests in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["endpoint"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let health_actions_total = IntCounterVec::new(
            Opts::new(
                "content_health_actions_total",
                "Total number of administrative health actions",
            ),
            &["action"],
        )?;
        registry.register(Box::new(health_actions_total.clone()))?;

        let server_errors_total = IntCounter::new(
            "content_server_errors_total",
            "Total number of responses with a 5xx status",
        )?;
        registry.register(Box::new(server_errors_total.clone()))?;

        Ok(Self {
            registry,
            module_requests_total,
            rate_limited_total,
            composition_warnings_total,
            cache_lookups_total,
            request_duration_seconds,
            health_actions_total,
            server_errors_total,
        })
    }

    /// Record a finished module request
    pub fn record_module_response(&self, environment: &str, status: u16) {
        self.module_requests_total
            .with_label_values(&[environment, &status.to_string()])
            .inc();
        self.record_status(status);
    }

    /// Count a 5xx from any endpoint
    pub fn record_status(&self, status: u16) {
        if status >= 500 {
            self.server_errors_total.inc();
        }
    }

    pub fn record_rate_limited(&self, endpoint: &str) {
        self.rate_limited_total.with_label_values(&[endpoint]).inc();
    }

    pub fn record_composition_warnings(&self, count: usize) {
        self.composition_warnings_total.inc_by(count as u64);
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups_total.with_label_values(&[result]).inc();
    }

    pub fn record_duration(&self, endpoint: &str, elapsed: Duration) {
        self.request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_health_action(&self, action: &str) {
        self.health_actions_total.with_label_values(&[action]).inc();
    }

    /// Number of 5xx responses served so far
    pub fn server_errors(&self) -> u64 {
        self.server_errors_total.get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
