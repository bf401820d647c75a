//! Search Routes
//!
//! 定义搜索相关的 API 路由。

use crate::api::handlers::search_handler::*;
use crate::security::middleware::rate_limit_middleware;
use axum::{Router, middleware, routing::post};

use crate::api::app_state::AppState;

/// 创建搜索路由器，限流只作用于搜索接口
pub fn create_search_router(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/search", post(search_travel))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            rate_limit_middleware,
        ))
}
