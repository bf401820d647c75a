use crate::config::config::{AppConfig, ProviderKind};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "TRAVEL_SEARCH_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 优先级（后者覆盖前者）：
    /// 1. 内置默认值
    /// 2. ./config.toml（或 TRAVEL_SEARCH_CONFIG 指定的文件）
    /// 3. TRAVEL_SEARCH_ 前缀的环境变量，`__` 分隔层级
    /// 4. 未配置密钥时读取 GEMINI_API_KEY / OPENAI_API_KEY
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    ///
    /// 默认值按 `provider.kind` 选择，只切换类型即可得到该服务的地址和模型。
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        let overrides = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        // 类型非法时交给完整提取报错
        let kind: ProviderKind = overrides.extract_inner("provider.kind").unwrap_or_default();

        let figment =
            Figment::from(Serialized::defaults(AppConfig::for_provider(kind))).merge(overrides);

        let mut config: AppConfig = figment.extract()?;
        Self::apply_api_key_fallback(&mut config);
        Ok(config)
    }

    fn apply_api_key_fallback(config: &mut AppConfig) {
        if config.provider.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var(config.provider.kind.api_key_env()) {
                config.provider.api_key = key;
            }
        }
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.provider.api_key.trim().is_empty() {
            return Err(ConfigValidationError::MissingApiKey(
                config.provider.kind.api_key_env().to_string(),
            ));
        }

        if config.provider.timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        if config.rate_limit.max_requests == 0 || config.rate_limit.window_seconds == 0 {
            return Err(ConfigValidationError::InvalidRateLimit);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("模型服务 API 密钥未配置（设置 {0} 或 TRAVEL_SEARCH_PROVIDER__API_KEY）")]
    MissingApiKey(String),

    #[error("请求超时无效，必须大于 0")]
    InvalidTimeout,

    #[error("限流配置无效，请求数和窗口长度必须大于 0")]
    InvalidRateLimit,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    std::env::var("TRAVEL_SEARCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.provider.api_key = "test-key".into();
        config
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(ConfigLoader::validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_requires_api_key() {
        let mut config = valid_config();
        config.provider.api_key = "  ".into();
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::MissingApiKey("GEMINI_API_KEY".into()))
        );
    }

    #[test]
    fn test_validate_rejects_zero_port_and_limits() {
        let mut config = valid_config();
        config.server.port = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidPort)
        );

        let mut config = valid_config();
        config.rate_limit.max_requests = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidRateLimit)
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "travel.toml",
                r#"
                [provider]
                kind = "openai"
                api_key = "from-file"
                max_retries = 1

                [search]
                fallback_enabled = false
                "#,
            )?;

            let config = ConfigLoader::load_from(PathBuf::from("travel.toml"))?;
            assert_eq!(config.provider.kind, ProviderKind::OpenAi);
            assert_eq!(config.provider.api_key, "from-file");
            assert_eq!(config.provider.max_retries, 1);
            assert!(!config.search.fallback_enabled);
            assert_eq!(config.rate_limit.max_requests, 5);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("travel.toml", "[server]\nport = 4000\n")?;
            jail.set_env("TRAVEL_SEARCH_SERVER__PORT", "5000");
            jail.set_env("TRAVEL_SEARCH_PROVIDER__API_KEY", "from-env");

            let config = ConfigLoader::load_from(PathBuf::from("travel.toml"))?;
            assert_eq!(config.server.port, 5000);
            assert_eq!(config.provider.api_key, "from-env");
            Ok(())
        });
    }

    #[test]
    fn test_openai_kind_alone_selects_openai_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "travel.toml",
                r#"
                [provider]
                kind = "openai"
                api_key = "k"
                "#,
            )?;

            let config = ConfigLoader::load_from(PathBuf::from("travel.toml"))?;
            assert_eq!(config.provider.kind, ProviderKind::OpenAi);
            assert_eq!(config.provider.base_url, "https://api.openai.com/v1");
            assert_eq!(config.provider.model, "gpt-4o-mini");
            Ok(())
        });
    }

    #[test]
    fn test_openai_kind_from_env_keeps_explicit_model() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TRAVEL_SEARCH_PROVIDER__KIND", "openai");
            jail.set_env("TRAVEL_SEARCH_PROVIDER__MODEL", "gpt-4.1-mini");
            jail.set_env("OPENAI_API_KEY", "openai-key");

            let config = ConfigLoader::load_from(PathBuf::from("missing.toml"))?;
            assert_eq!(config.provider.kind, ProviderKind::OpenAi);
            assert_eq!(config.provider.base_url, "https://api.openai.com/v1");
            assert_eq!(config.provider.model, "gpt-4.1-mini");
            assert_eq!(config.provider.api_key, "openai-key");
            Ok(())
        });
    }

    #[test]
    fn test_standard_api_key_env_is_used_when_unset() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GEMINI_API_KEY", "standard-key");

            let config = ConfigLoader::load_from(PathBuf::from("missing.toml"))?;
            assert_eq!(config.provider.api_key, "standard-key");
            Ok(())
        });
    }
}
