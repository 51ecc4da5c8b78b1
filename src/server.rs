//! HTTP server and routing
//!
//! # Endpoints
//! - `GET|OPTIONS /api/content/modules/{moduleId}` - composed module
//! - `GET|OPTIONS /api/content/manifest` - environment-resolved manifest
//! - `GET|POST /api/health` - health snapshot and cache actions
//! - `GET /metrics` - Prometheus metrics

use crate::cache::ContentCache;
use crate::composer::ModuleComposer;
use crate::config::ServerConfig;
use crate::error::{ContentError, Result};
use crate::health_check::{handle_health_get, handle_health_post, HealthAggregator};
use crate::manifest_handler::{handle_manifest_preflight, handle_manifest_request};
use crate::metrics::ContentMetrics;
use crate::module_handler::{handle_module_preflight, handle_module_request, ModuleRequest};
use crate::rate_limit::RateLimiter;
use crate::request::client_ip;
use crate::response::{internal_error, method_not_allowed, not_found, HttpResponse};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

const MODULE_PREFIX: &str = "/api/content/modules/";

/// Shared state of a running service
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub composer: ModuleComposer,
    pub module_limiter: RateLimiter,
    pub manifest_limiter: RateLimiter,
    pub cache: Arc<ContentCache>,
    pub metrics: ContentMetrics,
    pub health: HealthAggregator,
}

impl AppState {
    /// Build service state from a validated configuration
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let metrics = ContentMetrics::new().map_err(|e| {
            ContentError::InternalError(format!("Failed to register metrics: {}", e))
        })?;

        Ok(AppState {
            composer: ModuleComposer::new(config.content_dir.clone()),
            module_limiter: RateLimiter::new(&config.rate_limit),
            manifest_limiter: RateLimiter::new(&config.manifest_rate_limit),
            cache: Arc::new(ContentCache::new(&config.cache)),
            metrics,
            health: HealthAggregator::new(Duration::from_secs(config.cache.health_ttl_secs)),
            config: Arc::new(config),
        })
    }
}

/// Content HTTP server
pub struct ContentServer {
    state: Arc<AppState>,
}

impl ContentServer {
    pub fn new(config: ServerConfig) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::new(config)?),
        })
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until the process exits
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self.state.config.listen_address.parse().map_err(|e| {
            ContentError::ConfigError(format!("Invalid listen_address: {}", e))
        })?;
        let listener = TcpListener::bind(addr).await?;
        serve(listener, self.state).await
    }
}

/// Accept connections on `listener`, one task per connection
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Content server listening on http://{}", addr);
    info!("  GET  {}{{moduleId}} - Composed module", MODULE_PREFIX);
    info!("  GET  /api/content/manifest - Content manifest");
    info!("  GET  /api/health - Health status");
    info!("  POST /api/health - Cache actions");
    info!("  GET  /metrics - Prometheus metrics");

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = Arc::clone(&state);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { route(state, req, Some(peer)).await }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}

/// Dispatch one request to its handler
pub async fn route<B>(
    state: Arc<AppState>,
    req: Request<B>,
    peer: Option<SocketAddr>,
) -> std::result::Result<HttpResponse, Infallible>
where
    B: Body,
    B::Error: Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("{} {}", method, req.uri());

    let response = if let Some(module_id) = path.strip_prefix(MODULE_PREFIX) {
        match method {
            Method::GET => {
                let request = ModuleRequest {
                    module_id,
                    query: req.uri().query(),
                    client_ip: client_ip(req.headers(), peer),
                    uri: req.uri().to_string(),
                    user_agent: req
                        .headers()
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                };
                Ok(handle_module_request(&state, &request).await)
            }
            Method::OPTIONS => Ok(handle_module_preflight(&state)),
            _ => method_not_allowed("GET, OPTIONS"),
        }
    } else {
        match (method, path.as_str()) {
            (Method::GET, "/api/content/manifest") => {
                let client = client_ip(req.headers(), peer);
                let uri = req.uri().to_string();
                Ok(handle_manifest_request(&state, req.uri().query(), &client, &uri).await)
            }
            (Method::OPTIONS, "/api/content/manifest") => Ok(handle_manifest_preflight(&state)),
            (_, "/api/content/manifest") => method_not_allowed("GET, OPTIONS"),
            (Method::GET, "/api/health") => Ok(handle_health_get(&state).await),
            (Method::POST, "/api/health") => {
                let body = match req.into_body().collect().await {
                    Ok(collected) => collected.to_bytes(),
                    Err(e) => {
                        debug!("Failed to read health action body: {}", e);
                        Bytes::new()
                    }
                };
                Ok(handle_health_post(&state, &body).await)
            }
            (_, "/api/health") => method_not_allowed("GET, POST"),
            (Method::GET, "/metrics") => Ok(metrics_response(&state)),
            _ => not_found(),
        }
    };

    Ok(response.unwrap_or_else(|e| {
        error!("Failed to build response for {}: {}", path, e);
        internal_error()
    }))
}

fn metrics_response(state: &AppState) -> HttpResponse {
    match state.metrics.encode() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| internal_error()),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            internal_error()
        }
    }
}
