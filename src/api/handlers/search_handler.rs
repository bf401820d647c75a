use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::Value;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    api::{app_state::AppState, dto::search_dto::*},
    error::{AppError, SearchError},
    security::validation::ValidationError,
};

/// POST /api/search
///
/// Caller rate limiting runs before this handler as route middleware.
#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn search_travel(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|e| {
        debug!(error = %e, "rejecting unreadable request body");
        AppError::Validation(ValidationError::InvalidBody.to_string())
    })?;

    let query = state
        .validator
        .validate_search_body(&body)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    debug!(query = %query, "searching travel inventory");

    let results = state
        .search_service
        .search_travel(&query)
        .await
        .map_err(|e| {
            match &e {
                SearchError::RateLimited => {
                    warn!("provider quota exhausted and fallback disabled")
                }
                other => error!(error = ?other, "search error"),
            }
            AppError::from(e)
        })?;

    Ok(Json(SearchResponse { results }))
}
