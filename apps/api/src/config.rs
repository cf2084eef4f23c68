use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};

/// Name of the environment variable holding the DashScope credential.
pub const API_KEY_VAR: &str = "QWEN_API_KEY";

const DEFAULT_MODEL: &str = "qwen-turbo";
const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Application configuration loaded from environment variables.
///
/// The API key is optional at startup: a missing key is reported per request as
/// `MissingCredential` so the service can still answer health checks and
/// validation errors while it is being set up.
#[derive(Clone)]
pub struct Config {
    pub qwen_api_key: Option<String>,
    pub qwen_model: String,
    pub dashscope_base_url: String,
    pub llm_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match get("LLM_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Config {
            qwen_api_key: get(API_KEY_VAR).map(|k| k.trim().to_string()),
            qwen_model: get("QWEN_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            dashscope_base_url: get("DASHSCOPE_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            llm_timeout: Duration::from_secs(timeout_secs),
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field(
                "qwen_api_key",
                &self.qwen_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("qwen_model", &self.qwen_model)
            .field("dashscope_base_url", &self.dashscope_base_url)
            .field("llm_timeout", &self.llm_timeout)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert!(config.qwen_api_key.is_none());
        assert_eq!(config.qwen_model, "qwen-turbo");
        assert_eq!(config.dashscope_base_url, "https://dashscope.aliyuncs.com");
        assert_eq!(config.llm_timeout, Duration::from_secs(60));
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_model_override_and_key() {
        let config = config_from(&[("QWEN_API_KEY", "sk-123"), ("QWEN_MODEL", "qwen-plus")]).unwrap();
        assert_eq!(config.qwen_api_key.as_deref(), Some("sk-123"));
        assert_eq!(config.qwen_model, "qwen-plus");
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let config = config_from(&[("QWEN_API_KEY", "   ")]).unwrap();
        assert!(config.qwen_api_key.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = config_from(&[("DASHSCOPE_BASE_URL", "http://localhost:9000/")]).unwrap();
        assert_eq!(config.dashscope_base_url, "http://localhost:9000");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(config_from(&[("PORT", "not-a-port")]).is_err());
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        assert!(config_from(&[("LLM_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = config_from(&[("QWEN_API_KEY", "sk-secret")]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
