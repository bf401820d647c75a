//! Request Validation Module
//!
//! Query validation and prompt-injection sanitization for the search endpoint.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static TAG_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static INSTRUCTION_OVERRIDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bignore\s+(?:above|previous|all)\b").expect("valid regex"));

/// Validation error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Query is required")]
    MissingQuery,

    #[error("Query is too long. Please keep it under {max} characters.")]
    TooLong { max: usize, got: usize },

    #[error("Invalid request body format")]
    InvalidBody,
}

/// Validation result type
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Search query validator
#[derive(Debug, Clone)]
pub struct RequestValidator {
    /// Maximum query length in characters
    max_query_length: usize,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestValidator {
    pub fn new() -> Self {
        Self {
            max_query_length: 300,
        }
    }

    /// Set maximum query length
    pub fn with_max_query_length(mut self, length: usize) -> Self {
        self.max_query_length = length;
        self
    }

    /// Pull `query` out of a JSON body; it must be a non-empty string after trimming.
    pub fn extract_query(&self, body: &Value) -> ValidationResult<String> {
        let query = body
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();

        if query.is_empty() {
            return Err(ValidationError::MissingQuery);
        }

        Ok(query.to_string())
    }

    /// Validate field length
    pub fn validate_length(&self, query: &str) -> ValidationResult<()> {
        let length = query.chars().count();
        if length > self.max_query_length {
            return Err(ValidationError::TooLong {
                max: self.max_query_length,
                got: length,
            });
        }
        Ok(())
    }

    /// Extract, length-check and sanitize in one step.
    pub fn validate_search_body(&self, body: &Value) -> ValidationResult<String> {
        let query = self.extract_query(body)?;
        self.validate_length(&query)?;

        let sanitized = Self::sanitize_query(&query);
        if sanitized.is_empty() {
            return Err(ValidationError::MissingQuery);
        }
        Ok(sanitized)
    }

    /// Strip tag-like substrings and instruction-override phrases.
    pub fn sanitize_query(input: &str) -> String {
        let without_tags = TAG_LIKE.replace_all(input, "");
        let without_overrides = INSTRUCTION_OVERRIDE.replace_all(&without_tags, "");
        without_overrides
            .chars()
            .filter(|c| !c.is_control() || c.is_whitespace())
            .collect::<String>()
            .trim()
            .to_string()
    }
}
