use restaurant_content::{ContentError, ServerConfig};
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), yaml).unwrap();
    file
}

#[test]
fn test_load_bundled_config() {
    let config = ServerConfig::from_file("content_server.yaml");
    assert!(config.is_ok(), "Failed to load bundled config: {:?}", config.err());

    let config = config.unwrap();
    assert_eq!(config.listen_address, "127.0.0.1:3000");
    assert_eq!(config.content_dir, PathBuf::from("config/content"));
    assert_eq!(config.rate_limit.window_ms, 60_000);
    assert_eq!(config.rate_limit.max_requests, 200);
    assert_eq!(config.manifest_rate_limit.max_requests, 100);
    assert_eq!(config.max_response_bytes, 1_048_576);
    assert_eq!(config.allowed_origins, "*");
    assert!(!config.development_mode);
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.max_size_bytes, 50 * 1024 * 1024);
    assert_eq!(config.health.memory_alert_percent, 80.0);
}

#[test]
fn test_load_minimal_config() {
    let file = write_config("content_dir: \"/srv/restaurant\"\n");

    let config = ServerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.content_dir, PathBuf::from("/srv/restaurant"));
    assert_eq!(config.manifest_path(), PathBuf::from("/srv/restaurant/manifest.json"));
    // Check defaults are applied
    assert_eq!(config.listen_address, "127.0.0.1:3000");
    assert_eq!(config.rate_limit.max_requests, 200);
    assert_eq!(config.cache.health_ttl_secs, 30);
}

#[test]
fn test_load_invalid_config() {
    let file = write_config("rate_limit:\n  window_ms: 0\n  max_requests: 10\n");

    match ServerConfig::from_file(file.path()) {
        Err(ContentError::ConfigError(msg)) => assert!(msg.contains("window_ms")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_load_malformed_yaml() {
    let file = write_config("rate_limit: [not, a, map\n");
    let result = ServerConfig::from_file(file.path());
    assert!(matches!(result, Err(ContentError::ConfigError(_))));
}

#[test]
fn test_load_nonexistent_file() {
    let config = ServerConfig::from_file("nonexistent.yaml");
    assert!(config.is_err(), "Should fail when file doesn't exist");
}
