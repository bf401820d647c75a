//! Security Middleware Module
//!
//! Axum middleware for per-caller rate limiting and security headers.

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::api::app_state::AppState;
use crate::error::AppError;
use crate::security::rate_limit::{RateLimitClient, RateLimitInfo, RateLimitResult};

/// Rate limiting middleware
///
/// Rejected requests never reach the handler.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client = RateLimitClient::from_headers(req.headers());

    match state.rate_limiter.check_rate_limit(&client) {
        RateLimitResult::Allowed => next.run(req).await,
        RateLimitResult::AllowedWithInfo(info) => {
            let response = next.run(req).await;
            add_rate_limit_headers(response, &info)
        }
        RateLimitResult::Limited { retry_after, limit } => {
            warn!(client = client.as_str(), retry_after, "rejecting request over caller rate limit");
            state.metrics.record_caller_rate_limited();
            let response = AppError::CallerRateLimited { retry_after }.into_response();
            add_rate_limit_headers(response, &limit)
        }
    }
}

/// Add rate limit headers to response
fn add_rate_limit_headers(mut response: Response, info: &RateLimitInfo) -> Response {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(info.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(info.remaining));
    headers.insert(
        "X-RateLimit-Reset",
        HeaderValue::from(info.reset_at.timestamp()),
    );
    response
}

/// Security headers middleware
pub async fn security_headers_middleware(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    response
}

