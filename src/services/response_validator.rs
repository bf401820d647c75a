//! Provider reply validation
//!
//! Turns the raw text returned by the AI client into hydrated
//! [`SearchResult`]s. Only `id` and `reason` are taken from the provider;
//! everything else comes from the inventory.

use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, error};

use crate::error::SearchError;
use crate::models::inventory::Inventory;
use crate::models::search_result::{SearchResult, truncate_chars};

/// Diagnostic snippet length for malformed replies.
pub const MAX_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct AiResponse {
    results: Vec<AiResultEntry>,
}

#[derive(Debug, Deserialize)]
struct AiResultEntry {
    id: i64,
    reason: String,
}

/// Remove a surrounding ``` or ```json fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // drop the info string (e.g. "json") up to the first newline
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse, schema-check and hydrate a provider reply.
pub fn validate(raw: &str, inventory: &Inventory) -> Result<Vec<SearchResult>, SearchError> {
    let cleaned = strip_code_fence(raw);

    let parsed: serde_json::Value = serde_json::from_str(cleaned).map_err(|e| {
        error!(error = %e, raw = %raw, "non-JSON response from provider");
        SearchError::MalformedResponse {
            snippet: truncate_chars(raw, MAX_SNIPPET_CHARS),
        }
    })?;

    let response: AiResponse = serde_json::from_value(parsed.clone()).map_err(|e| {
        error!(error = %e, parsed = %parsed, "provider response failed schema validation");
        SearchError::SchemaViolation(e.to_string())
    })?;

    let mut seen = HashSet::new();
    let mut results = Vec::with_capacity(response.results.len().min(inventory.len()));

    for entry in response.results {
        let item = u32::try_from(entry.id)
            .ok()
            .and_then(|id| inventory.get(id));

        let Some(item) = item else {
            debug!(id = entry.id, "dropping result for unknown inventory id");
            continue;
        };

        if !seen.insert(item.id) {
            debug!(id = item.id, "dropping duplicate result");
            continue;
        }

        results.push(SearchResult::from_item(item, &entry.reason));
    }

    Ok(results)
}
