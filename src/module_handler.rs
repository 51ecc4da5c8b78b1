//! `GET /api/content/modules/{moduleId}`
//!
//! Pipeline: rate limit, module id validation, query validation, manifest
//! load, version check, cached or fresh composition, size cap, headers.
//! Expected failures map to fixed 4xx/5xx bodies; anything else becomes a
//! 500 tagged with a correlation id.

use crate::cache::ContentCache;
use crate::cache_headers::{
    with_cors_headers, with_preflight_headers, with_security_headers, CachePolicy, NO_STORE,
};
use crate::composer::{validate_module_id, Composition, ModuleMetadata, ModuleResponse};
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
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Validated query parameters of a module request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleQuery {
    pub env: Environment,
    pub version: Option<String>,
    pub compress: bool,
}

impl ModuleQuery {
    /// Parse `env`, `version` and `compress` from a raw query string
    ///
    /// Unknown parameters are ignored. An empty `version` counts as absent.
    pub fn parse(query: Option<&str>) -> Result<Self> {
        let mut parsed = ModuleQuery::default();
        let mut seen_env = false;
        let mut seen_version = false;
        let mut seen_compress = false;

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
                "compress" if !seen_compress => {
                    seen_compress = true;
                    parsed.compress = match value {
                        "true" => true,
                        "false" => false,
                        other => {
                            return Err(ContentError::InvalidQuery(format!(
                                "compress must be 'true' or 'false'; got '{}'",
                                other
                            )))
                        }
                    };
                }
                _ => {}
            }
        }
        Ok(parsed)
    }
}

/// Request details the module handler needs
#[derive(Debug, Clone)]
pub struct ModuleRequest<'a> {
    pub module_id: &'a str,
    pub query: Option<&'a str>,
    pub client_ip: String,
    pub uri: String,
    pub user_agent: Option<String>,
}

/// Serve a module request, recording metrics for the outcome
pub async fn handle_module_request(
    state: &AppState,
    request: &ModuleRequest<'_>,
) -> HttpResponse {
    let start = Instant::now();

    let response = match serve(state, request, start).await {
        Ok(response) => response,
        Err(e) => failure_response(state, request, &e),
    };

    let environment = ModuleQuery::parse(request.query)
        .map(|q| q.env.as_str())
        .unwrap_or("unknown");
    state
        .metrics
        .record_module_response(environment, response.status().as_u16());
    state.metrics.record_duration("module", start.elapsed());
    response
}

/// CORS preflight for the module endpoint
pub fn handle_module_preflight(state: &AppState) -> HttpResponse {
    let builder = with_preflight_headers(
        Response::builder().status(StatusCode::OK),
        &state.config.allowed_origins,
    );
    builder
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| internal_error())
}

async fn serve(
    state: &AppState,
    request: &ModuleRequest<'_>,
    start: Instant,
) -> Result<HttpResponse> {
    let module_id = request.module_id;

    let now_ms = epoch_millis();
    let decision = state.module_limiter.check(&request.client_ip, now_ms).await?;
    if !decision.allowed {
        state.metrics.record_rate_limited("module");
        return rate_limited(&decision, now_ms);
    }

    if let Err(e) = validate_module_id(module_id) {
        return error_response(&e);
    }

    let query = match ModuleQuery::parse(request.query) {
        Ok(query) => query,
        Err(e) => return error_response(&e),
    };

    let manifest = match Manifest::load(state.config.manifest_path()).await {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("Failed to load content manifest for module {}: {}", module_id, e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({"error": "Failed to load content manifest"}),
            );
        }
    };

    if let Some(requested) = &query.version {
        if *requested != manifest.version {
            return error_response(&ContentError::version_mismatch(requested, &manifest.version));
        }
    }

    let Some(module) = manifest.module(module_id) else {
        return error_response(&ContentError::ModuleNotFound(module_id.to_string()));
    };

    let (composition, cache_status) =
        compose_cached(state, &manifest, module_id, query.env).await?;

    let data_size = serde_json::to_vec(&composition.data)?.len();
    let mut body = ModuleResponse {
        id: module_id.to_string(),
        data: composition.data.clone(),
        metadata: ModuleMetadata {
            loaded_at: iso_timestamp(),
            environment: query.env,
            version: manifest.version.clone(),
            dependencies: composition.dependencies.clone(),
            cache_duration: module.cache_duration,
            size: data_size,
            response_size_bytes: 0,
            load_time_ms: start.elapsed().as_millis() as u64,
            compression: (if query.compress { "enabled" } else { "disabled" }).to_string(),
            warnings: composition.warnings.clone(),
        },
    };
    let bytes = body.to_json_bytes()?;

    let max_size = state.config.max_response_bytes;
    if bytes.len() > max_size {
        debug!(
            "Module {} too large: {} bytes exceeds {}",
            module_id,
            bytes.len(),
            max_size
        );
        return error_response(&ContentError::ResponseTooLarge {
            max_size,
            actual_size: bytes.len(),
        });
    }

    let mut builder = CachePolicy::for_module(module.cache_duration, query.env)
        .apply(json_builder(StatusCode::OK));
    builder = with_security_headers(builder)
        .header("X-Module-ID", module_id)
        .header("X-Module-Size", module.size.as_str())
        .header("X-Environment", query.env.as_str())
        .header("X-Content-Version", manifest.version.as_str())
        .header("X-Response-Time", format!("{}ms", start.elapsed().as_millis()))
        .header("X-Content-Length", bytes.len().to_string())
        .header("X-Cache-Status", cache_status);
    if query.env == Environment::Prod {
        builder = with_cors_headers(builder, &state.config.allowed_origins);
    }

    Ok(builder.body(Full::new(Bytes::from(bytes)))?)
}

/// Fetch a composition from the content cache or compose it fresh
async fn compose_cached(
    state: &AppState,
    manifest: &Manifest,
    module_id: &str,
    env: Environment,
) -> Result<(Arc<Composition>, &'static str)> {
    let use_cache = state.cache.applies_to(env);
    let key = ContentCache::cache_key(env, &manifest.version, module_id);

    if use_cache {
        let cached = state.cache.lookup(&key);
        state.metrics.record_cache_lookup(cached.is_some());
        if let Some(composition) = cached {
            return Ok((composition, "hit"));
        }
    }

    let started = Instant::now();
    let composition = Arc::new(state.composer.compose(manifest, module_id, env).await?);
    state.cache.record_load_time(started.elapsed());
    state
        .metrics
        .record_composition_warnings(composition.warnings.len());

    if use_cache {
        if let Some(module) = manifest.module(module_id) {
            let ttl = Duration::from_millis(module.cache_duration);
            state.cache.store(&key, Arc::clone(&composition), ttl)?;
        }
    }
    Ok((composition, "miss"))
}

/// 500 response for failures outside the expected error paths
fn failure_response(
    state: &AppState,
    request: &ModuleRequest<'_>,
    err: &ContentError,
) -> HttpResponse {
    let module_id = request.module_id;
    let error_id = error_id(&format!("module-{}", module_id), epoch_millis());
    let timestamp = iso_timestamp();

    error!(
        "[{}] Error serving module {}: error={}, uri={}, user_agent={}, timestamp={}",
        error_id,
        module_id,
        err,
        request.uri,
        request.user_agent.as_deref().unwrap_or("-"),
        timestamp
    );

    let development = state.config.development_mode;
    let mut body = json!({
        "error": format!("Failed to load module {}", module_id),
        "errorId": error_id,
        "message": if development { err.to_string() } else { "Internal server error".to_string() },
        "timestamp": timestamp,
    });
    if development {
        body["details"] = json!(format!("{:?}", err));
    }

    let builder = json_builder(StatusCode::INTERNAL_SERVER_ERROR)
        .header("Cache-Control", NO_STORE)
        .header("X-Error-ID", error_id.as_str())
        .header("X-Error-Type", "module-load-failed");
    finish_json(builder, &body).unwrap_or_else(|_| internal_error())
}
