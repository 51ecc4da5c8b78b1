//! JSON response builders shared by the handlers

use crate::cache_headers::NO_STORE;
use crate::error::{ContentError, Result};
use crate::rate_limit::RateLimitDecision;
use bytes::Bytes;
use http::response::Builder;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

pub type HttpResponse = Response<Full<Bytes>>;

/// Builder preset for a JSON body
pub fn json_builder(status: StatusCode) -> Builder {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
}

/// Serialize `body` into a finished response from `builder`
pub fn finish_json<T: Serialize>(builder: Builder, body: &T) -> Result<HttpResponse> {
    let json = serde_json::to_vec(body)?;
    Ok(builder.body(Full::new(Bytes::from(json)))?)
}

/// Uncached JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<HttpResponse> {
    finish_json(json_builder(status).header("Cache-Control", NO_STORE), body)
}

/// Uncached response for an expected failure, with the error's own status
pub fn error_response(err: &ContentError) -> Result<HttpResponse> {
    json_response(status_of(err), &error_body(err))
}

fn status_of(err: &ContentError) -> StatusCode {
    StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn error_body(err: &ContentError) -> Value {
    match err {
        ContentError::InvalidModuleId(_) => {
            json!({"error": "Invalid module ID", "details": err.to_string()})
        }
        ContentError::InvalidQuery(_) => {
            json!({"error": "Invalid query parameters", "details": err.to_string()})
        }
        ContentError::VersionMismatch {
            requested,
            available,
        } => json!({
            "error": "Version mismatch",
            "requested": requested,
            "available": available,
        }),
        ContentError::ResponseTooLarge {
            max_size,
            actual_size,
        } => json!({
            "error": "Module too large",
            "maxSize": max_size,
            "actualSize": actual_size,
        }),
        ContentError::RateLimited { retry_after_secs } => {
            json!({"error": "Rate limit exceeded", "retryAfter": retry_after_secs})
        }
        other => json!({"error": other.to_string()}),
    }
}

/// Plain 500 used when a response could not be built at all
pub fn internal_error() -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(
        br#"{"error":"Internal server error"}"#,
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// 429 carrying the retry hint and rate-limit headers
pub fn rate_limited(decision: &RateLimitDecision, now_ms: u64) -> Result<HttpResponse> {
    let retry_after = decision.retry_after_secs(now_ms);
    let err = ContentError::RateLimited {
        retry_after_secs: retry_after,
    };
    let builder = json_builder(status_of(&err))
        .header("Retry-After", retry_after.to_string())
        .header("X-RateLimit-Limit", decision.limit.to_string())
        .header("X-RateLimit-Remaining", decision.remaining().to_string())
        .header("X-RateLimit-Reset", decision.reset_time_ms.to_string());
    finish_json(builder, &error_body(&err))
}

/// 404 for unrouted paths
pub fn not_found() -> Result<HttpResponse> {
    json_response(StatusCode::NOT_FOUND, &json!({"error": "not found"}))
}

/// 405 listing the methods a route accepts
pub fn method_not_allowed(allow: &'static str) -> Result<HttpResponse> {
    finish_json(
        json_builder(StatusCode::METHOD_NOT_ALLOWED).header("Allow", allow),
        &json!({"error": "method not allowed"}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_rate_limited_response() {
        let decision = RateLimitDecision {
            allowed: false,
            count: 205,
            limit: 200,
            reset_time_ms: 31_000,
        };
        let response = rate_limited(&decision, 1_000).unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "30");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["x-ratelimit-limit"], "200");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"error": "Rate limit exceeded", "retryAfter": 30}));
    }

    #[tokio::test]
    async fn test_error_response_uses_error_status() {
        let response = error_response(&ContentError::version_mismatch("1.0", "2.0")).unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()["cache-control"], NO_STORE);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({"error": "Version mismatch", "requested": "1.0", "available": "2.0"})
        );

        let too_large = ContentError::ResponseTooLarge {
            max_size: 10,
            actual_size: 20,
        };
        let response = error_response(&too_large).unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let missing = ContentError::ModuleNotFound("menu".into());
        let response = error_response(&missing).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Module menu not found in manifest");
    }

    #[test]
    fn test_internal_error_status() {
        assert_eq!(internal_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
