//! 可观测性模块
//!
//! 提供 Prometheus 文本格式指标、结构化日志和健康检查。

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::config::LoggingConfig;

// ===== Simple Metrics =====

/// 简单应用指标
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub http_requests_total: AtomicU64,
    pub http_request_duration_sum: AtomicU64,
    pub search_requests_total: AtomicU64,
    pub search_latency_sum: AtomicU64,
    pub fallback_total: AtomicU64,
    pub provider_errors_total: AtomicU64,
    pub caller_rate_limited_total: AtomicU64,
}

impl AppMetrics {
    /// 记录 HTTP 请求
    pub fn record_http_request(&self, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::SeqCst);
        self.http_request_duration_sum
            .fetch_add(duration_ms, Ordering::SeqCst);
    }

    /// 记录搜索请求
    pub fn record_search(&self, duration_ms: u64) {
        self.search_requests_total.fetch_add(1, Ordering::SeqCst);
        self.search_latency_sum
            .fetch_add(duration_ms, Ordering::SeqCst);
    }

    /// 记录本地降级
    pub fn record_fallback(&self) {
        self.fallback_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录模型服务错误
    pub fn record_provider_error(&self) {
        self.provider_errors_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录调用方被限流
    pub fn record_caller_rate_limited(&self) {
        self.caller_rate_limited_total
            .fetch_add(1, Ordering::SeqCst);
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        format!(
            r#"# HELP http_requests_total Total HTTP requests
# TYPE http_requests_total counter
http_requests_total {}
# HELP http_request_duration_seconds HTTP request duration in seconds
# TYPE http_request_duration_seconds histogram
http_request_duration_seconds_sum {}
http_request_duration_seconds_count {}
# HELP search_requests_total Total search requests
# TYPE search_requests_total counter
search_requests_total {}
# HELP search_latency_seconds Search request latency in seconds
# TYPE search_latency_seconds histogram
search_latency_seconds_sum {}
search_latency_seconds_count {}
# HELP search_fallback_total Searches answered by the local keyword fallback
# TYPE search_fallback_total counter
search_fallback_total {}
# HELP provider_errors_total Searches that failed with a provider error
# TYPE provider_errors_total counter
provider_errors_total {}
# HELP caller_rate_limited_total Requests rejected by the per-caller rate limit
# TYPE caller_rate_limited_total counter
caller_rate_limited_total {}
"#,
            self.http_requests_total.load(Ordering::SeqCst),
            self.http_request_duration_sum.load(Ordering::SeqCst) as f64 / 1000.0,
            self.http_requests_total.load(Ordering::SeqCst),
            self.search_requests_total.load(Ordering::SeqCst),
            self.search_latency_sum.load(Ordering::SeqCst) as f64 / 1000.0,
            self.search_requests_total.load(Ordering::SeqCst),
            self.fallback_total.load(Ordering::SeqCst),
            self.provider_errors_total.load(Ordering::SeqCst),
            self.caller_rate_limited_total.load(Ordering::SeqCst),
        )
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub provider: String,
    pub inventory_size: usize,
}

/// 可观测性状态
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<AppMetrics>,
    pub start_time: DateTime<Utc>,
    pub version: String,
    pub provider: String,
    pub inventory_size: usize,
}

impl ObservabilityState {
    pub fn new(
        version: String,
        metrics: Arc<AppMetrics>,
        provider: String,
        inventory_size: usize,
    ) -> Self {
        Self {
            metrics,
            start_time: Utc::now(),
            version,
            provider,
            inventory_size,
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }
}

// ===== Handlers =====

/// 获取健康状态
pub async fn health_check(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        provider: state.provider.clone(),
        inventory_size: state.inventory_size,
    })
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// Prometheus 指标端点
pub async fn metrics(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    (axum::http::StatusCode::OK, state.metrics.gather())
}

/// 版本信息端点
pub async fn version(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Structured Logging =====

/// 初始化结构化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `log_dir` 时额外写入按天滚动的日志文件，
/// 返回的 guard 需要在进程生命周期内持有。
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},travel_search={}", config.level, config.level)));

    let (file_writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "travel-search.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
    });

    let registry = tracing_subscriber::registry().with(env_filter).with(file_layer);

    let result = if config.structured {
        registry
            .with(fmt::layer().json().with_target(true).with_line_number(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }

    guard
}

// ===== Request Metrics Middleware =====

/// 记录请求指标的中间件
pub async fn metrics_middleware(
    State(metrics): State<Arc<AppMetrics>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let start = std::time::Instant::now();
    let response = next.run(req).await;
    metrics.record_http_request(start.elapsed().as_millis() as u64);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[test]
    fn test_metrics_gather() {
        let metrics = AppMetrics::default();
        metrics.record_http_request(100);
        metrics.record_search(50);
        metrics.record_fallback();
        metrics.record_provider_error();
        metrics.record_caller_rate_limited();

        let output = metrics.gather();
        assert!(output.contains("http_requests_total 1"));
        assert!(output.contains("search_requests_total 1"));
        assert!(output.contains("search_fallback_total 1"));
        assert!(output.contains("provider_errors_total 1"));
        assert!(output.contains("caller_rate_limited_total 1"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = Arc::new(ObservabilityState::new(
            "0.1.0".to_string(),
            Arc::new(AppMetrics::default()),
            "gemini".to_string(),
            5,
        ));
        let app = create_observability_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["inventory_size"], 5);
    }
}
