use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// 模型服务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini generateContent REST API
    #[default]
    Gemini,
    /// OpenAI 兼容的 chat completions API
    OpenAi,
}

impl ProviderKind {
    /// 该类型的标准 API 密钥环境变量
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

/// 模型服务配置
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// 模型服务类型
    pub kind: ProviderKind,
    /// API 密钥
    pub api_key: String,
    /// 模型标识
    pub model: String,
    /// 服务基础地址
    pub base_url: String,
    /// Gemini API 版本（v1 / v1beta）
    pub api_version: String,
    /// 最大输出 token 数
    pub max_output_tokens: u32,
    /// 请求超时（秒）
    pub timeout_seconds: u64,
    /// 是否在 429 时重试
    pub retry_enabled: bool,
    /// 最大重试次数
    pub max_retries: u32,
    /// 退避基础延迟（毫秒），每次翻倍
    pub retry_base_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::gemini()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("retry_enabled", &self.retry_enabled)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}

impl ProviderConfig {
    /// Gemini 默认配置
    pub fn gemini() -> Self {
        Self {
            kind: ProviderKind::Gemini,
            api_key: String::new(),
            model: "gemini-2.0-flash".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_version: "v1beta".into(),
            max_output_tokens: 512,
            timeout_seconds: 15,
            retry_enabled: true,
            max_retries: 3,
            retry_base_delay_ms: 2_000,
        }
    }

    /// OpenAI 默认配置
    pub fn openai() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_version: String::new(),
            ..Self::gemini()
        }
    }

    /// 指定类型的默认配置
    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Gemini => Self::gemini(),
            ProviderKind::OpenAi => Self::openai(),
        }
    }

    /// 实际允许的最大重试次数
    pub fn effective_retries(&self) -> u32 {
        if self.retry_enabled { self.max_retries } else { 0 }
    }
}

/// 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// 模型服务限流时是否降级到本地关键词匹配
    pub fallback_enabled: bool,
    /// 查询最大字符数
    pub max_query_length: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            max_query_length: 300,
        }
    }
}

/// 调用方限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// 是否启用
    pub enabled: bool,
    /// 每个窗口允许的请求数
    pub max_requests: u32,
    /// 窗口长度（秒）
    pub window_seconds: u64,
    /// 超过此数量时在插入时清理过期条目
    pub max_tracked_clients: usize,
    /// 后台清理间隔（秒）
    pub sweep_interval_seconds: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 5,
            window_seconds: 60,
            max_tracked_clients: 10_000,
            sweep_interval_seconds: 60,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 模型服务配置
    pub provider: ProviderConfig,
    /// 搜索配置
    pub search: SearchConfig,
    /// 限流配置
    pub rate_limit: RateLimitSettings,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 以指定模型服务类型的默认值为基础的配置
    pub fn for_provider(kind: ProviderKind) -> Self {
        Self {
            provider: ProviderConfig::for_kind(kind),
            ..Self::default()
        }
    }
}
