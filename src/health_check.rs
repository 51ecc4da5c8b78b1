//! System health aggregation
//!
//! `GET /api/health` combines three checks: the content data loaders
//! (manifest plus every module composition), the content cache and the
//! API's own response time. Snapshots are reused for a short TTL.
//! `POST /api/health` runs administrative cache actions.

use crate::cache::CacheStats;
use crate::cache_headers::NO_STORE;
use crate::manifest::{Environment, Manifest};
use crate::rate_limit::epoch_millis;
use crate::request::{iso_timestamp, request_id};
use crate::response::{finish_json, internal_error, json_builder, HttpResponse};
use crate::server::AppState;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// API response time above which the API check is degraded
const API_SLOW_MS: u64 = 500;
/// API response time reported as slower than expected
const API_VERY_SLOW_MS: u64 = 1000;

pub const AVAILABLE_ACTIONS: [&str; 3] = ["cache-optimize", "cache-warm", "cache-clear"];

/// Metric label for POST bodies that name no known action
const INVALID_ACTION_LABEL: &str = "invalid";

/// Health status of a component or of the whole service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is healthy and ready to serve requests
    Healthy,
    /// Service is degraded but still operational
    Degraded,
    /// Service is unhealthy and cannot serve requests
    Unhealthy,
}

impl HealthStatus {
    /// Convert health status to HTTP status code
    pub fn to_status_code(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    /// Combine component statuses
    ///
    /// Healthy iff every component is healthy, degraded if any component is
    /// healthy or degraded, otherwise unhealthy.
    pub fn combine<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        let statuses: Vec<HealthStatus> = statuses.into_iter().collect();
        if statuses.iter().all(|s| *s == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else if statuses.iter().any(|s| *s != HealthStatus::Unhealthy) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// Result of one component check
#[derive(Debug, Clone, Serialize)]
pub struct ComponentCheck {
    pub status: HealthStatus,
    pub details: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCheckDetails {
    pub response_time: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiCheck {
    pub status: HealthStatus,
    pub details: ApiCheckDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthChecks {
    pub data_loaders: ComponentCheck,
    pub cache: ComponentCheck,
    pub api: ApiCheck,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub cache: CacheStats,
    pub rate_limited_clients: usize,
    pub server_errors: u64,
}

/// Full health snapshot served by `GET /api/health`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub overall: HealthStatus,
    pub timestamp: String,
    pub environment: String,
    pub version: String,
    pub uptime: f64,
    pub checks: HealthChecks,
    pub metrics: HealthMetrics,
    pub recommendations: Vec<String>,
}

/// Body of `POST /api/health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthAction {
    pub action: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub env: Option<Environment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseMeta {
    cached: bool,
    timestamp: String,
    source: &'static str,
    env: String,
    load_time: u64,
    version: &'static str,
    request_id: String,
}

#[derive(Debug, Serialize)]
struct ApiError {
    code: &'static str,
    message: String,
    details: Value,
}

/// Envelope shared by both health endpoints
#[derive(Debug, Serialize)]
struct ApiEnvelope<T: Serialize> {
    status: &'static str,
    data: Option<T>,
    meta: ResponseMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
}

/// Builds and caches health snapshots
pub struct HealthAggregator {
    started_at: Instant,
    ttl: Duration,
    snapshot: RwLock<Option<(Instant, SystemHealth)>>,
}

impl HealthAggregator {
    pub fn new(ttl: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            ttl,
            snapshot: RwLock::new(None),
        }
    }

    /// Current snapshot, reusing a cached one younger than the TTL
    ///
    /// Returns the snapshot and whether it came from the cache.
    pub async fn snapshot(&self, state: &AppState) -> (SystemHealth, bool) {
        if let Some((taken_at, health)) = self.snapshot.read().await.as_ref() {
            if taken_at.elapsed() < self.ttl {
                return (health.clone(), true);
            }
        }

        let health = self.check(state).await;
        *self.snapshot.write().await = Some((Instant::now(), health.clone()));
        (health, false)
    }

    /// Drop the cached snapshot
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
    }

    /// Run every check now
    pub async fn check(&self, state: &AppState) -> SystemHealth {
        let start = Instant::now();
        let mut recommendations = Vec::new();

        let data_loaders = check_data_loaders(state).await;
        if data_loaders.status != HealthStatus::Healthy {
            recommendations.push("Some data loaders are experiencing issues".to_string());
        }

        let cache_health = state.cache.health(&state.config.health);
        if cache_health.status != HealthStatus::Healthy {
            recommendations.extend(cache_health.recommendations.iter().cloned());
        }
        let cache = ComponentCheck {
            status: cache_health.status,
            details: json!({
                "stats": cache_health.details,
                "issues": cache_health.issues,
            }),
        };

        let response_time = start.elapsed().as_millis() as u64;
        let api_status = if response_time > API_VERY_SLOW_MS {
            recommendations.push("API response time is slower than expected".to_string());
            HealthStatus::Degraded
        } else if response_time > API_SLOW_MS {
            recommendations.push("API response time could be improved".to_string());
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        let api = ApiCheck {
            status: api_status,
            details: ApiCheckDetails {
                response_time,
                errors: state.metrics.server_errors(),
            },
        };

        let overall = HealthStatus::combine([data_loaders.status, cache.status, api.status]);
        if overall != HealthStatus::Healthy {
            warn!("System health is {}", overall.as_str());
        }

        SystemHealth {
            overall,
            timestamp: iso_timestamp(),
            environment: environment_name(state).to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime: self.started_at.elapsed().as_secs_f64(),
            checks: HealthChecks {
                data_loaders,
                cache,
                api,
            },
            metrics: HealthMetrics {
                cache: cache_health.details,
                rate_limited_clients: state.module_limiter.tracked_clients().await,
                server_errors: state.metrics.server_errors(),
            },
            recommendations,
        }
    }
}

fn environment_name(state: &AppState) -> &'static str {
    if state.config.development_mode {
        "development"
    } else {
        "production"
    }
}

fn content_environment(state: &AppState) -> Environment {
    if state.config.development_mode {
        Environment::Dev
    } else {
        Environment::Prod
    }
}

/// Load the manifest and compose every module once
///
/// A module composing with warnings is degraded; one failing outright is
/// unhealthy. An unreadable manifest makes the whole check unhealthy.
async fn check_data_loaders(state: &AppState) -> ComponentCheck {
    let manifest = match Manifest::load(state.config.manifest_path()).await {
        Ok(manifest) => manifest,
        Err(e) => {
            return ComponentCheck {
                status: HealthStatus::Unhealthy,
                details: json!({"error": e.to_string()}),
            }
        }
    };

    let env = content_environment(state);
    let mut modules = Map::new();
    let mut statuses = Vec::with_capacity(manifest.modules.len());
    for module_id in manifest.modules.keys() {
        let (status, detail) = match state.composer.compose(&manifest, module_id, env).await {
            Ok(composition) if composition.warnings.is_empty() => {
                (HealthStatus::Healthy, json!({"status": HealthStatus::Healthy}))
            }
            Ok(composition) => (
                HealthStatus::Degraded,
                json!({"status": HealthStatus::Degraded, "warnings": composition.warnings}),
            ),
            Err(e) => (
                HealthStatus::Unhealthy,
                json!({"status": HealthStatus::Unhealthy, "error": e.to_string()}),
            ),
        };
        statuses.push(status);
        modules.insert(module_id.clone(), detail);
    }

    ComponentCheck {
        status: HealthStatus::combine(statuses),
        details: json!({
            "manifestVersion": manifest.version,
            "modules": modules,
        }),
    }
}

fn meta(state: &AppState, cached: bool, started: Instant) -> ResponseMeta {
    ResponseMeta {
        cached,
        timestamp: iso_timestamp(),
        source: "api",
        env: content_environment(state).to_string(),
        load_time: started.elapsed().as_millis() as u64,
        version: env!("CARGO_PKG_VERSION"),
        request_id: request_id(epoch_millis()),
    }
}

fn envelope_response<T: Serialize>(status: StatusCode, envelope: &ApiEnvelope<T>) -> HttpResponse {
    let builder = json_builder(status).header("Cache-Control", NO_STORE);
    finish_json(builder, envelope).unwrap_or_else(|_| internal_error())
}

fn success<T: Serialize>(
    state: &AppState,
    data: T,
    cached: bool,
    started: Instant,
) -> ApiEnvelope<T> {
    ApiEnvelope {
        status: "success",
        data: Some(data),
        meta: meta(state, cached, started),
        error: None,
    }
}

fn failure(
    state: &AppState,
    code: &'static str,
    message: String,
    details: Value,
    started: Instant,
) -> ApiEnvelope<Value> {
    ApiEnvelope {
        status: "error",
        data: None,
        meta: meta(state, false, started),
        error: Some(ApiError {
            code,
            message,
            details,
        }),
    }
}

/// `GET /api/health`
pub async fn handle_health_get(state: &AppState) -> HttpResponse {
    let started = Instant::now();
    let (health, cached) = state.health.snapshot(state).await;
    let status = health.overall.to_status_code();
    state.metrics.record_duration("health", started.elapsed());
    envelope_response(status, &success(state, health, cached, started))
}

/// `POST /api/health`
pub async fn handle_health_post(state: &AppState, body: &[u8]) -> HttpResponse {
    let started = Instant::now();

    let action: HealthAction = match serde_json::from_slice(body) {
        Ok(action) => action,
        Err(e) => {
            let response = envelope_response(
                StatusCode::BAD_REQUEST,
                &failure(
                    state,
                    "HEALTH_ACTION_FAILED",
                    "Failed to execute health action".to_string(),
                    json!({"originalError": e.to_string()}),
                    started,
                ),
            );
            state.metrics.record_health_action(INVALID_ACTION_LABEL);
            state.metrics.record_status(response.status().as_u16());
            return response;
        }
    };

    info!("Health action requested: {}", action.action);
    let response = match action.action.as_str() {
        "cache-optimize" => {
            let report = state.cache.optimize();
            envelope_response(StatusCode::OK, &success(state, report, false, started))
        }
        "cache-warm" => {
            let env = action.env.unwrap_or_else(|| content_environment(state));
            match Manifest::load(state.config.manifest_path()).await {
                Ok(manifest) => {
                    let report = state.cache.warm(&state.composer, &manifest, env).await;
                    envelope_response(StatusCode::OK, &success(state, report, false, started))
                }
                Err(e) => envelope_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &failure(
                        state,
                        "HEALTH_ACTION_FAILED",
                        "Failed to execute health action".to_string(),
                        json!({"originalError": e.to_string()}),
                        started,
                    ),
                ),
            }
        }
        "cache-clear" => {
            let cleared = state
                .cache
                .invalidate_pattern(action.pattern.as_deref().unwrap_or(""));
            envelope_response(
                StatusCode::OK,
                &success(state, json!({"cleared": cleared}), false, started),
            )
        }
        other => envelope_response(
            StatusCode::BAD_REQUEST,
            &failure(
                state,
                "INVALID_ACTION",
                format!("Unknown action: {}", other),
                json!({"availableActions": AVAILABLE_ACTIONS}),
                started,
            ),
        ),
    };

    if response.status().is_success() {
        state.health.invalidate().await;
    }
    let label = if AVAILABLE_ACTIONS.contains(&action.action.as_str()) {
        action.action.as_str()
    } else {
        INVALID_ACTION_LABEL
    };
    state.metrics.record_health_action(label);
    state.metrics.record_status(response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_to_status_code() {
        assert_eq!(HealthStatus::Healthy.to_status_code(), StatusCode::OK);
        assert_eq!(HealthStatus::Degraded.to_status_code(), StatusCode::OK);
        assert_eq!(HealthStatus::Unhealthy.to_status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_combine() {
        use HealthStatus::*;
        assert_eq!(HealthStatus::combine([Healthy, Healthy, Healthy]), Healthy);
        assert_eq!(HealthStatus::combine([Healthy, Unhealthy, Unhealthy]), Degraded);
        assert_eq!(HealthStatus::combine([Degraded, Unhealthy, Unhealthy]), Degraded);
        assert_eq!(HealthStatus::combine([Unhealthy, Unhealthy, Unhealthy]), Unhealthy);
        assert_eq!(HealthStatus::combine(Vec::new()), Healthy);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(HealthStatus::Degraded).unwrap(), json!("degraded"));
        assert_eq!(HealthStatus::Unhealthy.as_str(), "unhealthy");
    }

    #[test]
    fn test_action_parsing() {
        let action: HealthAction =
            serde_json::from_str(r#"{"action": "cache-clear", "pattern": "prod:"}"#).unwrap();
        assert_eq!(action.action, "cache-clear");
        assert_eq!(action.pattern.as_deref(), Some("prod:"));
        assert!(action.env.is_none());
    }
}
