//! Request inspection helpers shared by the HTTP handlers

use chrono::{SecondsFormat, Utc};
use http::HeaderMap;
use rand::Rng;
use std::net::SocketAddr;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Resolve the client address used as the rate-limit key
///
/// The first entry of `X-Forwarded-For` wins, then the socket peer address.
/// Falls back to `"unknown"` when neither is available.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Split a raw query string into `(name, value)` pairs
///
/// Values are taken verbatim; no percent-decoding is applied. A name
/// without `=` gets an empty value.
pub fn query_pairs(query: Option<&str>) -> Vec<(&str, &str)> {
    query
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect()
}

/// `count` random lowercase base36 characters
pub fn random_suffix(count: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// Correlation id attached to an unexpected failure
///
/// `scope` names what failed, e.g. `module-pages/home` or `manifest`.
pub fn error_id(scope: &str, now_ms: u64) -> String {
    format!("{}-{}-{}", scope, now_ms, random_suffix(9))
}

/// Id echoed in the `meta.requestId` of health responses
pub fn request_id(now_ms: u64) -> String {
    format!("req_{}_{}", now_ms, random_suffix(9))
}

/// Current UTC time as an RFC 3339 string with millisecond precision
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
