//! Security Module
//!
//! Protects the search endpoint:
//! - Per-caller rate limiting
//! - Query validation and sanitization
//! - Security middleware

pub mod middleware;
pub mod rate_limit;
#[cfg(test)]
mod security_tests;
pub mod validation;

pub use rate_limit::{RateLimitClient, RateLimitConfig, RateLimitResult, RateLimiter};
pub use validation::{RequestValidator, ValidationError};
