//! AI 模型服务客户端
//!
//! 向外部模型服务发送单轮提示词并返回原始文本。支持 Gemini generateContent
//! 和 OpenAI 兼容的 chat completions 两种接口，429 时按指数退避重试。

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::config::{ProviderConfig, ProviderKind};
use crate::error::SearchError;

/// 约束模型只输出 JSON 的系统指令
pub const SYSTEM_INSTRUCTION: &str =
    "You are a travel recommendation assistant. Always respond with raw JSON only, no markdown, no explanation.";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiClient: Send + Sync {
    /// 发送提示词，返回模型回复的原始文本
    async fn call(&self, prompt: &str) -> Result<String, SearchError>;
}

/// 第 `attempt` 次（从 0 开始）重试前的等待时间：base × 2^attempt
pub fn backoff_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_delay_ms.saturating_mul(factor))
}

/// 基于 HTTP 的模型服务客户端
pub struct ProviderClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("config", &self.config)
            .finish()
    }
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Result<Self, SearchError> {
        if config.api_key.trim().is_empty() {
            return Err(SearchError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SearchError::ProviderError {
                status: None,
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.kind {
            ProviderKind::Gemini => format!(
                "{}/{}/models/{}:generateContent",
                base, self.config.api_version, self.config.model
            ),
            ProviderKind::OpenAi => format!("{}/chat/completions", base),
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        match self.config.kind {
            ProviderKind::Gemini => {
                let mut generation_config = json!({
                    "maxOutputTokens": self.config.max_output_tokens,
                });
                // v1 does not accept responseMimeType
                if self.config.api_version != "v1" {
                    generation_config["responseMimeType"] = json!("application/json");
                }

                json!({
                    "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
                    "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                    "generationConfig": generation_config,
                })
            }
            ProviderKind::OpenAi => json!({
                "model": self.config.model,
                "max_tokens": self.config.max_output_tokens,
                "response_format": { "type": "json_object" },
                "messages": [
                    { "role": "system", "content": SYSTEM_INSTRUCTION },
                    { "role": "user", "content": prompt },
                ],
            }),
        }
    }

    /// 单次请求，429 映射为 `RateLimited`
    async fn send_once(&self, prompt: &str) -> Result<String, SearchError> {
        let request = self.client.post(self.endpoint()).json(&self.request_body(prompt));
        let request = match self.config.kind {
            ProviderKind::Gemini => request.header("x-goog-api-key", &self.config.api_key),
            ProviderKind::OpenAi => request.bearer_auth(&self.config.api_key),
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }

        if !status.is_success() {
            let message = provider_error_message(&body);
            error!(status = status.as_u16(), %message, "provider returned an error");
            return Err(SearchError::ProviderError {
                status: Some(status.as_u16()),
                message,
            });
        }

        if body.trim().is_empty() {
            return Err(SearchError::EmptyResponse);
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|e| {
            SearchError::ProviderError {
                status: Some(status.as_u16()),
                message: format!("unreadable provider envelope: {}", e),
            }
        })?;

        let text = extract_text(self.config.kind, &parsed).unwrap_or_default();
        if text.trim().is_empty() {
            return Err(SearchError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl AiClient for ProviderClient {
    async fn call(&self, prompt: &str) -> Result<String, SearchError> {
        let max_retries = self.config.effective_retries();
        let mut attempt: u32 = 0;

        loop {
            debug!(provider = %self.config.kind, attempt, "calling provider");

            match self.send_once(prompt).await {
                Err(SearchError::RateLimited) if attempt < max_retries => {
                    let delay = backoff_delay(self.config.retry_base_delay_ms, attempt);
                    warn!(
                        provider = %self.config.kind,
                        "provider 429, retrying in {}ms (attempt {}/{})",
                        delay.as_millis(),
                        attempt + 1,
                        max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else {
        SearchError::ProviderError {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// 提取模型回复文本
fn extract_text(kind: ProviderKind, body: &Value) -> Option<String> {
    match kind {
        ProviderKind::Gemini => {
            let parts = body
                .get("candidates")?
                .get(0)?
                .get("content")?
                .get("parts")?
                .as_array()?;
            let text: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            Some(text)
        }
        ProviderKind::OpenAi => body
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()
            .map(str::to_string),
    }
}

/// 两种接口的错误体都是 `{"error": {"message": ...}}`
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// 根据配置创建客户端
pub fn create_ai_client(config: &ProviderConfig) -> Result<Box<dyn AiClient>, SearchError> {
    Ok(Box::new(ProviderClient::new(config.clone())?))
}
