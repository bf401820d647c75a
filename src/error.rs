//! 错误处理模块
//!
//! 定义搜索流程的领域错误和 HTTP 层的错误类型，以及它们到响应的映射。

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 面向调用方的通用服务端错误消息
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Check the server logs for details.";

/// 模型服务配额耗尽时返回给调用方的消息
pub const PROVIDER_QUOTA_MESSAGE: &str = "API quota exceeded. Please wait a minute and try again, or generate a new API key with your AI provider.";

/// 调用方请求过多时返回的消息
pub const CALLER_RATE_LIMIT_MESSAGE: &str =
    "Too many requests. Please wait a minute before searching again.";

/// 搜索流程错误（AI 客户端、响应校验）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// 模型服务限流，重试耗尽
    #[error("provider rate limited the request after all retries")]
    RateLimited,

    /// 请求超时
    #[error("provider request timed out")]
    Timeout,

    /// 模型服务返回非成功状态或传输失败
    #[error("provider error (status {status:?}): {message}")]
    ProviderError {
        status: Option<u16>,
        message: String,
    },

    /// 成功响应但没有文本
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// 响应不是合法 JSON
    #[error("provider returned non-JSON: {snippet}")]
    MalformedResponse { snippet: String },

    /// 响应 JSON 结构不符合约定
    #[error("schema validation failed: {0}")]
    SchemaViolation(String),

    /// 未配置 API 密钥
    #[error("provider API key is not set")]
    MissingApiKey,
}

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 参数验证错误
    #[error("{0}")]
    Validation(String),

    /// 调用方速率限制
    #[error("{}", CALLER_RATE_LIMIT_MESSAGE)]
    CallerRateLimited { retry_after: u64 },

    /// 模型服务配额耗尽（未启用降级时）
    #[error("{}", PROVIDER_QUOTA_MESSAGE)]
    ProviderQuotaExceeded,

    /// 搜索流程错误
    #[error("search failed: {0}")]
    Search(SearchError),
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::RateLimited => AppError::ProviderQuotaExceeded,
            other => AppError::Search(other),
        }
    }
}

impl AppError {
    /// 返回给调用方的消息；服务端细节不外泄
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(_)
            | AppError::CallerRateLimited { .. }
            | AppError::ProviderQuotaExceeded => self.to_string(),
            AppError::Search(_) => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Axum response implementation for AppError
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code): (u16, String) = (&self).into();
        let body = Json(ErrorResponse::new(&code, &self.public_message()));
        let mut response = (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response();

        if let AppError::CallerRateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误消息
    pub error: String,
    /// 错误代码
    pub code: String,
}

impl ErrorResponse {
    /// 创建新错误响应
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error: message.to_string(),
            code: code.to_string(),
        }
    }
}

/// HTTP 状态码映射
impl From<&AppError> for (u16, String) {
    fn from(err: &AppError) -> (u16, String) {
        match err {
            AppError::Validation(_) => (400, "BAD_REQUEST".to_string()),
            AppError::CallerRateLimited { .. } => (429, "RATE_LIMITED".to_string()),
            AppError::ProviderQuotaExceeded => (429, "PROVIDER_QUOTA_EXCEEDED".to_string()),
            AppError::Search(_) => (500, "SEARCH_FAILED".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_maps_to_provider_quota() {
        let err: AppError = SearchError::RateLimited.into();
        let (status, code): (u16, String) = (&err).into();
        assert_eq!(status, 429);
        assert_eq!(code, "PROVIDER_QUOTA_EXCEEDED");
    }

    #[test]
    fn test_search_errors_hide_detail() {
        let err: AppError = SearchError::MalformedResponse {
            snippet: "secret provider output".to_string(),
        }
        .into();
        let (status, _): (u16, String) = (&err).into();
        assert_eq!(status, 500);
        assert_eq!(err.public_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_validation_message_is_echoed() {
        let err = AppError::Validation("Query is required".to_string());
        assert_eq!(err.public_message(), "Query is required");
    }

    #[test]
    fn test_caller_rate_limit_sets_retry_after() {
        let response = AppError::CallerRateLimited { retry_after: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }
}
