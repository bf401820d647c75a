//! 搜索编排服务
//!
//! 组合 AI 客户端、响应校验和本地关键词降级，提供 `search_travel` 操作。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::error::SearchError;
use crate::models::inventory::Inventory;
use crate::models::search_result::SearchResult;
use crate::observability::AppMetrics;
use crate::services::ai_client::AiClient;
use crate::services::{fallback, response_validator};

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search_travel(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

/// 构建发送给模型的提示词，库存只包含 id / title / location / tags
pub fn build_prompt(inventory: &Inventory, query: &str) -> String {
    let slim = serde_json::to_string(&inventory.projection()).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Inventory: {slim}\n\n\
         User query: \"{query}\"\n\n\
         Return a JSON object in this exact format: {{\"results\":[{{\"id\":<number>,\"reason\":\"<why it matches>\"}}]}}\n\
         Only include items that genuinely match the query."
    )
}

pub struct TravelSearchService {
    ai_client: Arc<dyn AiClient>,
    inventory: Arc<Inventory>,
    fallback_enabled: bool,
    metrics: Arc<AppMetrics>,
}

impl TravelSearchService {
    pub fn new(
        ai_client: Arc<dyn AiClient>,
        inventory: Arc<Inventory>,
        fallback_enabled: bool,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            ai_client,
            inventory,
            fallback_enabled,
            metrics,
        }
    }
}

#[async_trait]
impl SearchService for TravelSearchService {
    async fn search_travel(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let start = Instant::now();
        let prompt = build_prompt(&self.inventory, query);

        let outcome = match self.ai_client.call(&prompt).await {
            Ok(raw) => response_validator::validate(&raw, &self.inventory),
            Err(SearchError::RateLimited) if self.fallback_enabled => {
                warn!("provider rate limited, using local keyword fallback");
                self.metrics.record_fallback();
                Ok(fallback::match_query(query, &self.inventory))
            }
            Err(e) => Err(e),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        self.metrics.record_search(duration_ms);

        match &outcome {
            Ok(results) => info!(results = results.len(), duration_ms, "search completed"),
            Err(e) => {
                self.metrics.record_provider_error();
                error!(error = %e, duration_ms, "search failed");
            }
        }

        outcome
    }
}

/// 创建搜索服务
pub fn create_search_service(
    ai_client: Arc<dyn AiClient>,
    inventory: Arc<Inventory>,
    fallback_enabled: bool,
    metrics: Arc<AppMetrics>,
) -> Box<dyn SearchService> {
    Box::new(TravelSearchService::new(
        ai_client,
        inventory,
        fallback_enabled,
        metrics,
    ))
}
