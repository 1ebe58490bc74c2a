use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cache::HISTORY_LIMIT;
use crate::error::{AppError, Result};
use crate::models::Provider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_provider")]
    pub provider: String,

    pub deepseek_key: Option<String>,
    pub qwen_key: Option<String>,

    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,

    #[serde(default = "default_qwen_model")]
    pub qwen_model: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("briefly");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("cache.db").to_string_lossy().to_string()
}

fn default_provider() -> String {
    Provider::DeepSeek.as_str().to_string()
}

fn default_deepseek_model() -> String {
    Provider::DeepSeek.default_model().to_string()
}

fn default_qwen_model() -> String {
    Provider::Qwen.default_model().to_string()
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_history_limit() -> usize {
    HISTORY_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            provider: default_provider(),
            deepseek_key: None,
            qwen_key: None,
            deepseek_model: default_deepseek_model(),
            qwen_model: default_qwen_model(),
            language: default_language(),
            history_limit: default_history_limit(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Parses TOML config text. A `history_limit` of 0 is raised to 1.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        if config.history_limit == 0 {
            tracing::warn!("history_limit must be at least 1; using 1");
            config.history_limit = 1;
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("briefly")
            .join("config.toml")
    }

    /// Model configured for `provider`; blank entries fall back to the provider default.
    pub fn model_for(&self, provider: Provider) -> String {
        let configured = match provider {
            Provider::DeepSeek => self.deepseek_model.trim(),
            Provider::Qwen => self.qwen_model.trim(),
        };
        if configured.is_empty() {
            provider.default_model().to_string()
        } else {
            configured.to_string()
        }
    }

    pub fn api_key_for(&self, provider: Provider) -> Option<String> {
        let key = match provider {
            Provider::DeepSeek => self.deepseek_key.as_deref(),
            Provider::Qwen => self.qwen_key.as_deref(),
        };
        key.map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/briefly.db"
            qwen_key = "sk-qwen"
            "#,
        )
        .unwrap();

        assert_eq!(config.provider, "deepseek");
        assert_eq!(config.deepseek_model, "deepseek-chat");
        assert_eq!(config.history_limit, 500);
        assert_eq!(config.api_key_for(Provider::Qwen).as_deref(), Some("sk-qwen"));
        assert!(config.api_key_for(Provider::DeepSeek).is_none());
    }

    #[test]
    fn test_blank_model_falls_back() {
        let config = Config {
            qwen_model: "   ".to_string(),
            deepseek_key: Some("  ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.model_for(Provider::Qwen), "qwen2.5-7b-instruct");
        assert!(config.api_key_for(Provider::DeepSeek).is_none());
    }

    #[test]
    fn test_zero_history_limit_is_raised() {
        let config = Config::parse("history_limit = 0").unwrap();
        assert_eq!(config.history_limit, 1);

        let config = Config::parse("history_limit = 20").unwrap();
        assert_eq!(config.history_limit, 20);
    }
}
