use crate::observability::AppMetrics;
use crate::security::rate_limit::RateLimiter;
use crate::security::validation::RequestValidator;
use crate::services::search::SearchService;
use std::sync::Arc;

/// Application state containing all shared services and security components
#[derive(Clone)]
pub struct AppState {
    /// Search orchestrator
    pub search_service: Arc<dyn SearchService>,
    /// Rate limiter for request throttling
    pub rate_limiter: Arc<RateLimiter>,
    /// Query validator
    pub validator: Arc<RequestValidator>,
    /// Request and search counters
    pub metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("search_service", &"Arc<dyn SearchService>")
            .field("rate_limiter", &self.rate_limiter)
            .field("validator", &self.validator)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        search_service: Box<dyn SearchService>,
        rate_limiter: RateLimiter,
        validator: RequestValidator,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            search_service: Arc::from(search_service),
            rate_limiter: Arc::new(rate_limiter),
            validator: Arc::new(validator),
            metrics,
        }
    }
}
