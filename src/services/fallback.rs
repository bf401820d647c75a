//! Offline keyword matcher
//!
//! Scores inventory items by how many distinct query tokens occur in their
//! title, location and tags. Used when the AI provider is rate limited.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::inventory::{Inventory, InventoryItem};
use crate::models::search_result::SearchResult;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Tokens at or below this length are ignored.
const MIN_TOKEN_CHARS: usize = 2;

const NO_MATCH_REASON: &str = "Showing all destinations: AI quota exceeded, try again later.";

/// Lowercase, split on non-word runs, keep distinct tokens longer than two chars.
pub fn tokenize(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();

    for token in NON_WORD.split(&lowered) {
        if token.chars().count() <= MIN_TOKEN_CHARS {
            continue;
        }
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }

    tokens
}

fn haystack(item: &InventoryItem) -> String {
    let mut parts = vec![item.title.to_lowercase(), item.location.to_lowercase()];
    parts.extend(item.tags.iter().map(|t| t.to_lowercase()));
    parts.join(" ")
}

/// A scored inventory item with the tokens that hit.
#[derive(Debug, Clone)]
pub struct ScoredItem<'a> {
    pub item: &'a InventoryItem,
    pub matches: Vec<String>,
}

impl ScoredItem<'_> {
    pub fn score(&self) -> usize {
        self.matches.len()
    }
}

/// Score every item; items with no hits are dropped. Ordered by score
/// descending, ties in inventory order.
pub fn score_items<'a>(tokens: &[String], inventory: &'a Inventory) -> Vec<ScoredItem<'a>> {
    let mut scored: Vec<ScoredItem<'a>> = inventory
        .items()
        .iter()
        .filter_map(|item| {
            let haystack = haystack(item);
            let matches: Vec<String> = tokens
                .iter()
                .filter(|t| haystack.contains(t.as_str()))
                .cloned()
                .collect();

            if matches.is_empty() {
                None
            } else {
                Some(ScoredItem { item, matches })
            }
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score().cmp(&a.score()));
    scored
}

/// Match `query` against the inventory without calling the provider.
///
/// Never returns an empty list for a non-empty inventory: when nothing
/// scores, every item is returned in inventory order.
pub fn match_query(query: &str, inventory: &Inventory) -> Vec<SearchResult> {
    let tokens = tokenize(query);
    let scored = score_items(&tokens, inventory);

    if scored.is_empty() {
        return inventory
            .items()
            .iter()
            .map(|item| SearchResult::from_item(item, NO_MATCH_REASON))
            .collect();
    }

    scored
        .into_iter()
        .map(|s| {
            let reason = format!(
                "Matched your search for \"{}\" (offline mode, AI quota exceeded).",
                s.matches.join(", ")
            );
            SearchResult::from_item(s.item, &reason)
        })
        .collect()
}
