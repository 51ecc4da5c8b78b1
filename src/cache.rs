//! In-process cache for composed modules
//!
//! Compositions for staging and prod are kept in memory for their module's
//! `cacheDuration`, keyed by environment, manifest version and module id.
//! Dev requests always compose fresh content.
//!
//! Size accounting uses the serialized length of the cached data. When a
//! store would exceed the configured budget, least recently used entries are
//! evicted first.

use crate::composer::{Composition, ModuleComposer};
use crate::config::{CacheConfig, HealthConfig};
use crate::error::{ContentError, Result};
use crate::health_check::HealthStatus;
use crate::manifest::{Environment, Manifest};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Entries older than this are reported as stale by the health check
const STALE_ENTRY_AGE: Duration = Duration::from_secs(60 * 60);

/// Lookups required before the hit rate is judged
const MIN_LOOKUPS_FOR_HIT_RATE: u64 = 10;

/// Cached composition with expiration and access tracking
struct CacheEntry {
    composition: Arc<Composition>,
    size_bytes: usize,
    created_at: Instant,
    expires_at: Instant,
    last_accessed: Instant,
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_bytes: usize,
    pub max_size_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub average_load_time_ms: f64,
    pub oldest_entry_age_ms: u64,
}

impl CacheStats {
    /// Share of the size budget in use, as a percentage
    pub fn memory_usage_percent(&self) -> f64 {
        if self.max_size_bytes == 0 {
            return 0.0;
        }
        self.total_bytes as f64 / self.max_size_bytes as f64 * 100.0
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Health verdict for the cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub status: HealthStatus,
    pub details: CacheStats,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Outcome of [`ContentCache::optimize`]
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub before: CacheStats,
    pub after: CacheStats,
    pub optimizations: Vec<String>,
}

/// Outcome of [`ContentCache::warm`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmReport {
    pub environment: Environment,
    pub success: Vec<String>,
    pub failures: Vec<String>,
    pub total_time_ms: u64,
}

/// Cache of composed modules
pub struct ContentCache {
    storage: Arc<RwLock<HashMap<String, CacheEntry>>>,
    enabled: bool,
    max_size_bytes: usize,
    current_size_bytes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    total_load_time_ms: AtomicU64,
}

impl ContentCache {
    pub fn new(config: &CacheConfig) -> Self {
        ContentCache {
            storage: Arc::new(RwLock::new(HashMap::new())),
            enabled: config.enabled,
            max_size_bytes: config.max_size_bytes,
            current_size_bytes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            total_load_time_ms: AtomicU64::new(0),
        }
    }

    /// Whether compositions for `env` go through the cache
    pub fn applies_to(&self, env: Environment) -> bool {
        self.enabled && env != Environment::Dev
    }

    /// Cache key for a module composition
    ///
    /// Format: `{env}:{version}:{moduleId}`
    pub fn cache_key(env: Environment, version: &str, module_id: &str) -> String {
        format!("{}:{}:{}", env, version, module_id)
    }

    /// Look up a live composition
    ///
    /// Expired entries count as a miss and are left for the next cleanup.
    pub fn lookup(&self, key: &str) -> Option<Arc<Composition>> {
        let now = Instant::now();

        let result = match self.storage.write() {
            Ok(mut storage) => match storage.get_mut(key) {
                Some(entry) if entry.expires_at > now => {
                    entry.last_accessed = now;
                    debug!("Cache hit: key={}, size={}", key, entry.size_bytes);
                    Some(Arc::clone(&entry.composition))
                }
                Some(_) => {
                    debug!("Cache entry expired: key={}", key);
                    None
                }
                None => {
                    debug!("Cache miss: key={}", key);
                    None
                }
            },
            Err(e) => {
                warn!("Cache lookup error: key={}, error={}", key, e);
                None
            }
        };

        match result {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    /// Store a composition for `ttl`
    ///
    /// A zero TTL is not stored. Entries larger than the whole budget are
    /// skipped with a warning.
    pub fn store(&self, key: &str, composition: Arc<Composition>, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Ok(());
        }

        let size_bytes = serde_json::to_vec(&composition.data)?.len();
        if size_bytes > self.max_size_bytes {
            warn!(
                "Composition too large to cache: key={}, size={}, max={}",
                key, size_bytes, self.max_size_bytes
            );
            return Ok(());
        }

        let current = self.current_size_bytes.load(Ordering::Relaxed) as usize;
        if current + size_bytes > self.max_size_bytes {
            debug!(
                "Cache size limit reached ({}/{}), evicting LRU entries",
                current, self.max_size_bytes
            );
            self.evict_lru(current + size_bytes - self.max_size_bytes);
        }

        let now = Instant::now();
        let mut storage = self.storage.write().map_err(lock_error)?;
        if let Some(old) = storage.insert(
            key.to_string(),
            CacheEntry {
                composition,
                size_bytes,
                created_at: now,
                expires_at: now + ttl,
                last_accessed: now,
            },
        ) {
            self.current_size_bytes
                .fetch_sub(old.size_bytes as u64, Ordering::Relaxed);
        }
        self.current_size_bytes
            .fetch_add(size_bytes as u64, Ordering::Relaxed);

        debug!("Stored composition in cache: key={}, size={}, ttl={:?}", key, size_bytes, ttl);
        Ok(())
    }

    /// Record how long a fresh composition took
    pub fn record_load_time(&self, elapsed: Duration) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    /// Remove every entry whose key contains `pattern`
    ///
    /// An empty pattern clears the cache. Returns the number of entries removed.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        self.remove_where(|key, _| key.contains(pattern))
    }

    /// Remove expired entries, returning how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        self.remove_where(|_, entry| entry.expires_at <= now)
    }

    /// Drop expired entries and trim the cache back under its budget
    pub fn optimize(&self) -> OptimizationReport {
        let before = self.get_stats();
        let mut optimizations = Vec::new();

        let removed = self.cleanup_expired();
        if removed > 0 {
            optimizations.push(format!("Removed {} stale entries", removed));
        }

        let current = self.current_size_bytes.load(Ordering::Relaxed) as usize;
        let target = self.max_size_bytes / 10 * 8;
        if current > target {
            let evicted = self.evict_lru(current - target);
            optimizations.push(format!("Evicted {} least recently used entries", evicted));
        }

        let after = self.get_stats();
        info!(
            "Cache optimized: entries {} -> {}, bytes {} -> {}",
            before.total_entries, after.total_entries, before.total_bytes, after.total_bytes
        );
        OptimizationReport {
            before,
            after,
            optimizations,
        }
    }

    /// Compose every module of `manifest` for `env` and cache the results
    ///
    /// Modules are composed even when `env` bypasses the cache, so the
    /// report still shows which modules compose cleanly.
    pub async fn warm(
        &self,
        composer: &ModuleComposer,
        manifest: &Manifest,
        env: Environment,
    ) -> WarmReport {
        let started = Instant::now();
        let resolved = manifest.resolve_for_environment(env);
        let mut success = Vec::new();
        let mut failures = Vec::new();

        info!("Starting cache warming for environment: {}", env);
        for (module_id, module) in &resolved.modules {
            let composed_at = Instant::now();
            match composer.compose(&resolved, module_id, env).await {
                Ok(composition) => {
                    self.record_load_time(composed_at.elapsed());
                    if self.applies_to(env) {
                        let key = Self::cache_key(env, &resolved.version, module_id);
                        let ttl = Duration::from_millis(module.cache_duration);
                        if let Err(e) = self.store(&key, Arc::new(composition), ttl) {
                            warn!("Cache warming could not store {}: {}", module_id, e);
                            failures.push(module_id.clone());
                            continue;
                        }
                    }
                    success.push(module_id.clone());
                }
                Err(e) => {
                    warn!("Cache warming failed for {}: {}", module_id, e);
                    failures.push(module_id.clone());
                }
            }
        }

        let total_time_ms = started.elapsed().as_millis() as u64;
        info!(
            "Cache warming completed in {}ms. Success: {}, Failures: {}",
            total_time_ms,
            success.len(),
            failures.len()
        );
        WarmReport {
            environment: env,
            success,
            failures,
            total_time_ms,
        }
    }

    /// Get cache statistics
    pub fn get_stats(&self) -> CacheStats {
        let now = Instant::now();
        let (total_entries, oldest) = match self.storage.read() {
            Ok(storage) => (
                storage.len(),
                storage.values().map(|e| now.duration_since(e.created_at)).max(),
            ),
            Err(_) => (0, None),
        };

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let loads = self.loads.load(Ordering::Relaxed);

        CacheStats {
            total_entries,
            total_bytes: self.current_size_bytes.load(Ordering::Relaxed) as usize,
            max_size_bytes: self.max_size_bytes,
            hits,
            misses,
            hit_rate: if lookups == 0 { 1.0 } else { hits as f64 / lookups as f64 },
            average_load_time_ms: if loads == 0 {
                0.0
            } else {
                self.total_load_time_ms.load(Ordering::Relaxed) as f64 / loads as f64
            },
            oldest_entry_age_ms: oldest.map(|d| d.as_millis() as u64).unwrap_or(0),
        }
    }

    /// Judge cache health against the configured thresholds
    ///
    /// No issues is healthy, one or two is degraded, more is unhealthy.
    pub fn health(&self, thresholds: &HealthConfig) -> CacheHealth {
        let stats = self.get_stats();
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if stats.lookups() >= MIN_LOOKUPS_FOR_HIT_RATE && stats.hit_rate < thresholds.hit_rate_min {
            issues.push(format!("Low cache hit rate: {:.1}%", stats.hit_rate * 100.0));
            recommendations
                .push("Consider increasing cacheDuration values or warming the cache".to_string());
        }

        if stats.average_load_time_ms > thresholds.load_time_max_ms as f64 {
            issues.push(format!(
                "High average load time: {:.0}ms",
                stats.average_load_time_ms
            ));
            recommendations.push("Consider splitting large modules into smaller files".to_string());
        }

        let memory = stats.memory_usage_percent();
        if memory > thresholds.memory_alert_percent {
            issues.push(format!("High memory usage: {:.1}%", memory));
            recommendations.push("Consider reducing cacheDuration or the cache size".to_string());
        }

        if stats.oldest_entry_age_ms > STALE_ENTRY_AGE.as_millis() as u64 {
            issues.push(format!(
                "Some cache entries are very old: {}h",
                stats.oldest_entry_age_ms / STALE_ENTRY_AGE.as_millis() as u64
            ));
            recommendations
                .push("Consider clearing long-lived entries after content updates".to_string());
        }

        let status = match issues.len() {
            0 => HealthStatus::Healthy,
            1..=2 => HealthStatus::Degraded,
            _ => HealthStatus::Unhealthy,
        };

        CacheHealth {
            status,
            details: stats,
            issues,
            recommendations,
        }
    }

    /// Evict least recently used entries until `needed_bytes` are freed
    fn evict_lru(&self, needed_bytes: usize) -> usize {
        let Ok(mut storage) = self.storage.write() else {
            return 0;
        };

        let mut entries: Vec<_> = storage
            .iter()
            .map(|(k, v)| (k.clone(), v.last_accessed, v.size_bytes))
            .collect();
        entries.sort_by_key(|(_, last_accessed, _)| *last_accessed);

        let mut freed_bytes = 0;
        let mut evicted = 0;
        for (key, _, size) in entries {
            if freed_bytes >= needed_bytes {
                break;
            }
            if storage.remove(&key).is_some() {
                freed_bytes += size;
                evicted += 1;
            }
        }
        self.current_size_bytes
            .fetch_sub(freed_bytes as u64, Ordering::Relaxed);

        debug!("LRU eviction: freed {} bytes by removing {} entries", freed_bytes, evicted);
        evicted
    }

    fn remove_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &CacheEntry) -> bool,
    {
        let Ok(mut storage) = self.storage.write() else {
            return 0;
        };
        let mut removed = 0;
        let mut removed_bytes = 0;
        storage.retain(|key, entry| {
            if predicate(key, entry) {
                removed += 1;
                removed_bytes += entry.size_bytes;
                false
            } else {
                true
            }
        });
        self.current_size_bytes
            .fetch_sub(removed_bytes as u64, Ordering::Relaxed);
        removed
    }
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> ContentError {
    ContentError::CacheError(format!("cache lock poisoned: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn composition(value: serde_json::Value) -> Arc<Composition> {
        Arc::new(Composition {
            data: value,
            dependencies: vec![],
            warnings: vec![],
        })
    }

    fn cache(max_size_bytes: usize) -> ContentCache {
        ContentCache::new(&CacheConfig {
            enabled: true,
            max_size_bytes,
            health_ttl_secs: 30,
        })
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(
            ContentCache::cache_key(Environment::Prod, "2.0", "pages/home"),
            "prod:2.0:pages/home"
        );
    }

    #[test]
    fn test_dev_bypasses_cache() {
        let cache = cache(1024);
        assert!(!cache.applies_to(Environment::Dev));
        assert!(cache.applies_to(Environment::Staging));
        assert!(cache.applies_to(Environment::Prod));
    }

    #[test]
    fn test_store_and_lookup() {
        let cache = cache(1024 * 1024);
        let key = "prod:1:menu";
        assert!(cache.lookup(key).is_none());

        cache.store(key, composition(json!({"a": 1})), Duration::from_secs(60)).unwrap();
        let hit = cache.lookup(key).unwrap();
        assert_eq!(hit.data, json!({"a": 1}));

        let stats = cache.get_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_bytes, 7);
    }

    #[test]
    fn test_expired_entry_is_miss() {
        let cache = cache(1024);
        cache.store("k", composition(json!(1)), Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.lookup("k").is_none());
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.get_stats().total_bytes, 0);
    }

    #[test]
    fn test_zero_ttl_not_stored() {
        let cache = cache(1024);
        cache.store("k", composition(json!(1)), Duration::ZERO).unwrap();
        assert_eq!(cache.get_stats().total_entries, 0);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = cache(30);
        let ttl = Duration::from_secs(60);
        cache.store("a", composition(json!("0123456789")), ttl).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        cache.store("b", composition(json!("0123456789")), ttl).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        cache.lookup("a");
        cache.store("c", composition(json!("0123456789")), ttl).unwrap();

        assert!(cache.lookup("a").is_some());
        assert!(cache.lookup("b").is_none());
        assert!(cache.lookup("c").is_some());
        assert!(cache.get_stats().total_bytes <= 30);
    }

    #[test]
    fn test_invalidate_pattern() {
        let cache = cache(1024);
        let ttl = Duration::from_secs(60);
        cache.store("prod:1:pages/home", composition(json!(1)), ttl).unwrap();
        cache.store("prod:1:pages/menu", composition(json!(2)), ttl).unwrap();
        cache.store("staging:1:core", composition(json!(3)), ttl).unwrap();

        assert_eq!(cache.invalidate_pattern("pages/"), 2);
        assert_eq!(cache.get_stats().total_entries, 1);
        assert_eq!(cache.invalidate_pattern(""), 1);
        assert_eq!(cache.get_stats().total_entries, 0);
    }

    #[test]
    fn test_health_low_hit_rate() {
        let cache = cache(1024);
        for _ in 0..10 {
            cache.lookup("missing");
        }
        let health = cache.health(&HealthConfig::default());
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.issues.len(), 1);
        assert!(health.issues[0].starts_with("Low cache hit rate"));
        assert_eq!(health.recommendations.len(), 1);
    }

    #[test]
    fn test_health_ignores_hit_rate_with_few_lookups() {
        let cache = cache(1024);
        cache.lookup("missing");
        assert_eq!(cache.health(&HealthConfig::default()).status, HealthStatus::Healthy);
    }

    #[test]
    fn test_optimize_reports_removed_entries() {
        let cache = cache(1024);
        cache.store("old", composition(json!(1)), Duration::from_millis(1)).unwrap();
        cache.store("live", composition(json!(2)), Duration::from_secs(60)).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let report = cache.optimize();
        assert_eq!(report.before.total_entries, 2);
        assert_eq!(report.after.total_entries, 1);
        assert_eq!(report.optimizations, vec!["Removed 1 stale entries"]);
    }

    #[tokio::test]
    async fn test_warm_populates_prod_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("home.json"), r#"{"title": "Home"}"#).unwrap();
        let manifest: Manifest = serde_json::from_value(json!({
            "version": "3",
            "modules": {
                "home": {"files": ["home.json"], "cacheDuration": 60000},
                "menu": {"files": ["menu.json"], "cacheDuration": 60000}
            }
        }))
        .unwrap();
        let composer = ModuleComposer::new(dir.path());
        let cache = cache(1024 * 1024);

        let report = cache.warm(&composer, &manifest, Environment::Prod).await;
        // Missing files only produce warnings, so both modules compose
        assert_eq!(report.success, vec!["home", "menu"]);
        assert!(report.failures.is_empty());
        assert!(cache.lookup("prod:3:home").is_some());

        let report = cache.warm(&composer, &manifest, Environment::Dev).await;
        assert_eq!(report.success.len(), 2);
        assert!(cache.lookup("dev:3:home").is_none());
    }
}
