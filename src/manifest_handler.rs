//! `GET /api/content/manifest`
//!
//! Serves the manifest resolved for one environment, behind its own rate
//! limiter.

use crate::cache_headers::{with_preflight_headers, with_security_headers, CachePolicy, NO_STORE};
use crate::error::{ContentError, Result};
use crate::manifest::{Environment, Manifest};
use crate::rate_limit::epoch_millis;
use crate::request::{error_id, iso_timestamp, query_pairs};
use crate::response::{
    error_response, finish_json, internal_error, json_builder, json_response, rate_limited,
    HttpResponse,
};
use crate::server::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::error;

/// Validated query parameters of a manifest request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestQuery {
    pub env: Environment,
    pub version: Option<String>,
    /// A non-empty `bust` parameter disables caching
    pub bust: bool,
}

impl ManifestQuery {
    pub fn parse(query: Option<&str>) -> Result<Self> {
        let mut parsed = ManifestQuery::default();
        let mut seen_env = false;
        let mut seen_version = false;

        for (key, value) in query_pairs(query) {
            match key {
                "env" if !seen_env => {
                    seen_env = true;
                    parsed.env = value.parse()?;
                }
                "version" if !seen_version => {
                    seen_version = true;
                    parsed.version = Some(value.to_string()).filter(|v| !v.is_empty());
                }
                "bust" => parsed.bust |= !value.is_empty(),
                _ => {}
            }
        }
        Ok(parsed)
    }
}

/// Serve a manifest request
pub async fn handle_manifest_request(
    state: &AppState,
    query: Option<&str>,
    client_ip: &str,
    uri: &str,
) -> HttpResponse {
    let start = Instant::now();
    let response = match serve(state, query, client_ip, start).await {
        Ok(response) => response,
        Err(e) => failure_response(state, uri, &e),
    };
    state.metrics.record_status(response.status().as_u16());
    state.metrics.record_duration("manifest", start.elapsed());
    response
}

/// CORS preflight for the manifest endpoint
pub fn handle_manifest_preflight(state: &AppState) -> HttpResponse {
    with_preflight_headers(
        Response::builder().status(StatusCode::OK),
        &state.config.allowed_origins,
    )
    .body(Full::new(Bytes::new()))
    .unwrap_or_else(|_| internal_error())
}

async fn serve(
    state: &AppState,
    query: Option<&str>,
    client_ip: &str,
    start: Instant,
) -> Result<HttpResponse> {
    let now_ms = epoch_millis();
    let decision = state.manifest_limiter.check(client_ip, now_ms).await?;
    if !decision.allowed {
        state.metrics.record_rate_limited("manifest");
        return rate_limited(&decision, now_ms);
    }

    let query = match ManifestQuery::parse(query) {
        Ok(query) => query,
        Err(e) => return error_response(&e),
    };

    let manifest = match Manifest::load(state.config.manifest_path()).await {
        Ok(manifest) => manifest,
        Err(ContentError::ManifestNotFound(_)) => {
            return json_response(
                StatusCode::NOT_FOUND,
                &json!({"error": "Content manifest not found"}),
            )
        }
        Err(e) => {
            error!("Manifest load error: {}", e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({"error": "Invalid manifest format"}),
            );
        }
    };

    if let Some(requested) = &query.version {
        if *requested != manifest.version {
            return error_response(&ContentError::version_mismatch(requested, &manifest.version));
        }
    }

    let resolved = manifest.resolve_for_environment(query.env);
    let mut body = serde_json::to_value(&resolved)?;
    if let Value::Object(fields) = &mut body {
        fields.insert("environment".to_string(), json!(query.env));
        fields.insert("timestamp".to_string(), json!(iso_timestamp()));
        fields.insert(
            "buildId".to_string(),
            json!(std::env::var("BUILD_ID").unwrap_or_else(|_| "unknown".to_string())),
        );
    }

    let mut builder =
        CachePolicy::for_manifest(query.env, query.bust).apply(json_builder(StatusCode::OK));
    builder = with_security_headers(builder)
        .header("Referrer-Policy", "strict-origin-when-cross-origin")
        .header("X-Content-Version", resolved.version.as_str())
        .header("X-Environment", query.env.as_str())
        .header("X-Response-Time", format!("{}ms", start.elapsed().as_millis()));
    if query.env == Environment::Prod {
        builder = with_preflight_headers(builder, &state.config.allowed_origins);
    }

    finish_json(builder, &body)
}

fn failure_response(state: &AppState, uri: &str, err: &ContentError) -> HttpResponse {
    let error_id = error_id("manifest", epoch_millis());
    let timestamp = iso_timestamp();
    error!(
        "[{}] Error serving content manifest: error={}, uri={}, timestamp={}",
        error_id, err, uri, timestamp
    );

    let development = state.config.development_mode;
    let body = json!({
        "error": "Failed to load content manifest",
        "errorId": error_id,
        "message": if development { err.to_string() } else { "Internal server error".to_string() },
        "timestamp": timestamp,
    });
    let builder = json_builder(StatusCode::INTERNAL_SERVER_ERROR)
        .header("Cache-Control", NO_STORE)
        .header("X-Error-ID", error_id.as_str())
        .header("X-Error-Type", "manifest-load-failed");
    finish_json(builder, &body).unwrap_or_else(|_| internal_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_query() {
        let query = ManifestQuery::parse(Some("env=dev&bust=123")).unwrap();
        assert_eq!(query.env, Environment::Dev);
        assert!(query.bust);

        let query = ManifestQuery::parse(None).unwrap();
        assert_eq!(query, ManifestQuery::default());
        assert!(ManifestQuery::parse(Some("env=qa")).is_err());
    }

    #[test]
    fn test_empty_bust_is_ignored() {
        assert!(!ManifestQuery::parse(Some("bust=")).unwrap().bust);
        assert!(!ManifestQuery::parse(Some("bust")).unwrap().bust);
        assert!(ManifestQuery::parse(Some("bust=&bust=1")).unwrap().bust);
    }
}
