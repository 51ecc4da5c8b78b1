//! Configuration management for the content service

use crate::error::{ContentError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the content service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to (default: "127.0.0.1:3000")
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Directory holding `manifest.json` and module files (default: "config/content")
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// Rate limit for the module endpoint (default: 200 requests / 60s)
    #[serde(default = "default_module_rate_limit")]
    pub rate_limit: RateLimitConfig,

    /// Rate limit for the manifest endpoint (default: 100 requests / 60s)
    #[serde(default = "default_manifest_rate_limit")]
    pub manifest_rate_limit: RateLimitConfig,

    /// Hard cap on a serialized module response in bytes (default: 1MB)
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// Value echoed in `Access-Control-Allow-Origin` (default: "*")
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    /// Include error messages and details in 500 responses (default: false)
    #[serde(default)]
    pub development_mode: bool,

    /// In-process content cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Health check thresholds
    #[serde(default)]
    pub health: HealthConfig,
}

/// Fixed-window rate limit settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    /// Window length in milliseconds
    pub window_ms: u64,

    /// Maximum requests per client within one window
    pub max_requests: u64,
}

/// Configuration for the in-process content cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Serve staging/prod compositions from memory until `cacheDuration`
    /// expires (default: false). Edits to content files are not seen until
    /// the entry expires or is cleared through `POST /api/health`.
    #[serde(default)]
    pub enabled: bool,

    /// Budget used for memory-pressure checks and LRU eviction (default: 50MB)
    #[serde(default = "default_cache_max_size")]
    pub max_size_bytes: usize,

    /// How long a health snapshot is reused (default: 30s)
    #[serde(default = "default_health_ttl")]
    pub health_ttl_secs: u64,
}

/// Thresholds used by the health aggregator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthConfig {
    /// Minimum acceptable cache hit rate in [0, 1] (default: 0.7)
    #[serde(default = "default_hit_rate_min")]
    pub hit_rate_min: f64,

    /// Maximum acceptable average composition time (default: 2000ms)
    #[serde(default = "default_load_time_max")]
    pub load_time_max_ms: u64,

    /// Cache memory usage percentage that triggers an alert (default: 80)
    #[serde(default = "default_memory_alert_percent")]
    pub memory_alert_percent: f64,
}

impl RateLimitConfig {
    fn validate(&self, name: &str) -> Result<()> {
        if self.window_ms == 0 {
            return Err(ContentError::ConfigError(format!(
                "{}.window_ms must be greater than 0",
                name
            )));
        }
        if self.max_requests == 0 {
            return Err(ContentError::ConfigError(format!(
                "{}.max_requests must be greater than 0",
                name
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_size_bytes: default_cache_max_size(),
            health_ttl_secs: default_health_ttl(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            hit_rate_min: default_hit_rate_min(),
            load_time_max_ms: default_load_time_max(),
            memory_alert_percent: default_memory_alert_percent(),
        }
    }
}

// Default value functions for serde
fn default_listen_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("config/content")
}

fn default_module_rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        window_ms: 60 * 1000,
        max_requests: 200,
    }
}

fn default_manifest_rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        window_ms: 60 * 1000,
        max_requests: 100,
    }
}

fn default_max_response_bytes() -> usize {
    1024 * 1024 // 1MB
}

fn default_allowed_origins() -> String {
    "*".to_string()
}

fn default_cache_max_size() -> usize {
    50 * 1024 * 1024 // 50MB
}

fn default_health_ttl() -> u64 {
    30
}

fn default_hit_rate_min() -> f64 {
    0.7
}

fn default_load_time_max() -> u64 {
    2000
}

fn default_memory_alert_percent() -> f64 {
    80.0
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_address: default_listen_address(),
            content_dir: default_content_dir(),
            rate_limit: default_module_rate_limit(),
            manifest_rate_limit: default_manifest_rate_limit(),
            max_response_bytes: default_max_response_bytes(),
            allowed_origins: default_allowed_origins(),
            development_mode: false,
            cache: CacheConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` if loading and validation succeed
    /// * `Err(ContentError)` if file cannot be read or config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ContentError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: ServerConfig = serde_yaml::from_str(&content).map_err(|e| {
            ContentError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration rooted at the given content directory
    pub fn with_content_dir<P: Into<PathBuf>>(content_dir: P) -> Self {
        ServerConfig {
            content_dir: content_dir.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - listen_address must parse as a socket address
    /// - content_dir must not be empty
    /// - rate limit windows and limits must be > 0
    /// - max_response_bytes must be > 0
    /// - hit_rate_min must be within [0, 1]
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(ContentError::ConfigError(format!(
                "listen_address '{}' is not a valid socket address",
                self.listen_address
            )));
        }

        if self.content_dir.as_os_str().is_empty() {
            return Err(ContentError::ConfigError(
                "content_dir must not be empty".to_string(),
            ));
        }

        self.rate_limit.validate("rate_limit")?;
        self.manifest_rate_limit.validate("manifest_rate_limit")?;

        if self.max_response_bytes == 0 {
            return Err(ContentError::ConfigError(
                "max_response_bytes must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.health.hit_rate_min) {
            return Err(ContentError::ConfigError(format!(
                "health.hit_rate_min must be between 0 and 1, got {}",
                self.health.hit_rate_min
            )));
        }

        if self.cache.enabled && self.cache.max_size_bytes == 0 {
            return Err(ContentError::ConfigError(
                "cache.max_size_bytes must be greater than 0 when caching is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the manifest file inside the content directory
    pub fn manifest_path(&self) -> PathBuf {
        self.content_dir.join("manifest.json")
    }
}
