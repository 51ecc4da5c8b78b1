//! Restaurant Content Service
//!
//! Serves the content of a restaurant website as JSON modules composed from
//! files on disk, plus the helpers the site uses to show whether the
//! restaurant is open.
//!
//! # Overview
//!
//! A `manifest.json` in the content directory lists every module with its
//! files, dependencies and cache duration, and optionally per-environment
//! overrides. A module request deep-merges the module's base files, applies
//! the environment override file and then folds in its dependencies. The
//! result is served with environment-specific cache headers, behind a
//! per-client fixed-window rate limiter and a response size cap.
//!
//! # Features
//!
//! - **Module composition**: base files, environment overrides and dependencies
//! - **Manifest resolution**: per-environment module exclusions and additions
//! - **Rate limiting**: fixed-window per-client counters for each endpoint
//! - **Content cache**: LRU cache of compositions for staging and prod
//! - **Health checks**: aggregated data loader, cache and API health
//! - **Hours status**: open/closed state and next opening time
//! - **Metrics**: Prometheus counters and histograms on `/metrics`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use restaurant_content::{ContentServer, ServerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_file("content_server.yaml")?;
//! ContentServer::new(config)?.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Hours status
//!
//! ```rust
//! use chrono::NaiveDate;
//! use restaurant_content::{restaurant_status, RestaurantHours};
//!
//! let hours = RestaurantHours::legacy([("monday", "11:00 AM - 10:00 PM")]);
//! // 2024-01-01 was a Monday
//! let now = NaiveDate::from_ymd_opt(2024, 1, 1)
//!     .unwrap()
//!     .and_hms_opt(12, 0, 0)
//!     .unwrap();
//!
//! let status = restaurant_status(&hours, &now);
//! assert!(status.is_open);
//! assert_eq!(status.current_hours.as_deref(), Some("11:00 AM - 10:00 PM"));
//! ```
//!
//! # Configuration
//!
//! ```yaml
//! listen_address: "127.0.0.1:3000"
//! content_dir: "config/content"
//! rate_limit:
//!   window_ms: 60000
//!   max_requests: 200
//! max_response_bytes: 1048576
//! cache:
//!   enabled: true
//!   max_size_bytes: 52428800
//! ```
//!
//! See [`ServerConfig`] for every option.

pub mod cache;
pub mod cache_headers;
pub mod composer;
pub mod config;
pub mod error;
pub mod health_check;
pub mod hours;
pub mod manifest;
pub mod manifest_handler;
pub mod merge;
pub mod metrics;
pub mod module_handler;
pub mod rate_limit;
pub mod request;
pub mod response;
pub mod server;
pub mod status;
pub mod time_format;
pub mod time_parser;

// Re-export commonly used types
pub use cache::{CacheStats, ContentCache};
pub use cache_headers::CachePolicy;
pub use composer::{validate_module_id, Composition, ModuleComposer, ModuleResponse};
pub use config::{CacheConfig, HealthConfig, RateLimitConfig, ServerConfig};
pub use error::{ContentError, Result};
pub use health_check::{HealthAggregator, HealthStatus, SystemHealth};
pub use hours::RestaurantHours;
pub use manifest::{Environment, Manifest, ModuleConfig};
pub use merge::deep_merge;
pub use metrics::ContentMetrics;
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use server::{AppState, ContentServer};
pub use status::{
    check_is_open, current_day_hours, is_time_range_open, next_open_time, restaurant_status,
    OpenStatus,
};
