//! Response caching, security and CORS headers

use crate::manifest::Environment;
use http::response::Builder;

pub const NO_STORE: &str = "no-cache, no-store, must-revalidate";

/// `stale-while-revalidate` window for prod responses, in seconds
const STALE_WHILE_REVALIDATE_SECS: u64 = 86_400;

/// Cache headers for one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub cache_control: String,
    pub cdn_cache_control: Option<String>,
    pub vary: Option<&'static str>,
}

impl CachePolicy {
    /// Policy for a module response with the given `cacheDuration`
    ///
    /// # Example
    /// ```
    /// use restaurant_content::cache_headers::CachePolicy;
    /// use restaurant_content::manifest::Environment;
    ///
    /// let policy = CachePolicy::for_module(3_600_000, Environment::Prod);
    /// assert_eq!(
    ///     policy.cache_control,
    ///     "public, max-age=3600, s-maxage=5400, stale-while-revalidate=86400"
    /// );
    /// ```
    pub fn for_module(cache_duration_ms: u64, env: Environment) -> Self {
        let max_age = cache_duration_ms / 1000;
        let s_maxage = max_age * 3 / 2;

        match env {
            Environment::Prod => CachePolicy {
                cache_control: format!(
                    "public, max-age={}, s-maxage={}, stale-while-revalidate={}",
                    max_age, s_maxage, STALE_WHILE_REVALIDATE_SECS
                ),
                cdn_cache_control: Some(format!("public, max-age={}", s_maxage)),
                vary: Some("Accept-Encoding, X-Environment"),
            },
            Environment::Staging => CachePolicy {
                cache_control: format!("public, max-age={}", max_age / 2),
                cdn_cache_control: None,
                vary: None,
            },
            Environment::Dev => Self::no_store(),
        }
    }

    /// Policy for the manifest endpoint
    ///
    /// Prod manifests are cached for an hour unless the client asked to bust
    /// the cache; every other case is uncached.
    pub fn for_manifest(env: Environment, bust: bool) -> Self {
        if env == Environment::Prod && !bust {
            CachePolicy {
                cache_control: format!(
                    "public, max-age=3600, s-maxage=7200, stale-while-revalidate={}",
                    STALE_WHILE_REVALIDATE_SECS
                ),
                cdn_cache_control: Some("public, max-age=7200".to_string()),
                vary: None,
            }
        } else {
            Self::no_store()
        }
    }

    pub fn no_store() -> Self {
        CachePolicy {
            cache_control: NO_STORE.to_string(),
            cdn_cache_control: None,
            vary: None,
        }
    }

    pub fn apply(&self, builder: Builder) -> Builder {
        let mut builder = builder.header("Cache-Control", self.cache_control.as_str());
        if let Some(cdn) = &self.cdn_cache_control {
            builder = builder.header("CDN-Cache-Control", cdn.as_str());
        }
        if let Some(vary) = self.vary {
            builder = builder.header("Vary", vary);
        }
        builder
    }
}

/// Fixed security headers sent with every content response
pub fn with_security_headers(builder: Builder) -> Builder {
    builder
        .header("X-Content-Type-Options", "nosniff")
        .header("X-Frame-Options", "DENY")
        .header("X-XSS-Protection", "1; mode=block")
}

/// CORS headers for cross-origin GETs
pub fn with_cors_headers(builder: Builder, allowed_origins: &str) -> Builder {
    builder
        .header("Access-Control-Allow-Origin", allowed_origins)
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, X-Environment")
}

/// CORS preflight headers, cached by the browser for a day
pub fn with_preflight_headers(builder: Builder, allowed_origins: &str) -> Builder {
    with_cors_headers(builder, allowed_origins).header("Access-Control-Max-Age", "86400")
}
