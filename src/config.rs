//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub use crate::retry::RetryPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on a single provider attempt
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Query signal sources one after another instead of concurrently
    #[serde(default)]
    pub sequential: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            sequential: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Hugging Face Inference API (anomaly + sequence classifiers)
#[derive(Debug, Clone, Deserialize)]
pub struct HuggingFaceConfig {
    #[serde(default = "default_hf_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Zero-shot model used for the normal/suspicious classification
    #[serde(default = "default_anomaly_model")]
    pub anomaly_model: String,
    /// Sentiment model applied to the transaction sequence
    #[serde(default = "default_sequence_model")]
    pub sequence_model: String,
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_hf_base_url(),
            api_key: String::new(),
            anomaly_model: default_anomaly_model(),
            sequence_model: default_sequence_model(),
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

/// Gemini generateContent API (compliance + insight narratives)
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Regulator named in the compliance prompt
    #[serde(default = "default_regulator")]
    pub regulator: String,
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            api_key: String::new(),
            model: default_gemini_model(),
            regulator: default_regulator(),
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_hf_base_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_anomaly_model() -> String {
    "facebook/bart-large-mnli".to_string()
}

fn default_sequence_model() -> String {
    "distilbert-base-uncased-finetuned-sst-2-english".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_regulator() -> String {
    "RBI".to_string()
}

fn default_http_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables, e.g. FRAUDGUARD__RETRY__MAX_ATTEMPTS
            .add_source(
                config::Environment::with_prefix("FRAUDGUARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Provider keys commonly live in their own variables
        if config.huggingface.api_key.is_empty() {
            if let Ok(key) = std::env::var("HUGGINGFACE_API_KEY") {
                config.huggingface.api_key = key;
            }
        }
        if config.gemini.api_key.is_empty() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                config.gemini.api_key = key;
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        if self.orchestrator.call_timeout_ms == 0 {
            anyhow::bail!("orchestrator.call_timeout_ms must be positive");
        }

        for (name, base_url) in [
            ("huggingface.base_url", &self.huggingface.base_url),
            ("gemini.base_url", &self.gemini.base_url),
        ] {
            url::Url::parse(base_url).with_context(|| format!("Invalid {}: {}", name, base_url))?;
        }

        if self.huggingface.anomaly_model.is_empty() || self.huggingface.sequence_model.is_empty() {
            anyhow::bail!("huggingface model names cannot be empty");
        }

        if self.gemini.model.is_empty() {
            anyhow::bail!("gemini.model cannot be empty");
        }

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            anyhow::bail!("Unknown logging.level: {}", self.logging.level);
        }

        Ok(())
    }

    /// Log providers that will run on fallback values only
    pub fn warn_missing_keys(&self) {
        if self.huggingface.api_key.is_empty() {
            tracing::warn!("No Hugging Face API key configured - anomaly and sequence signals will degrade");
        }
        if self.gemini.api_key.is_empty() {
            tracing::warn!("No Gemini API key configured - compliance and insight signals will degrade");
        }
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Retry:
    max_attempts: {}
    delay: {}ms
  Orchestrator:
    call_timeout: {}ms
    sequential: {}
  Hugging Face:
    base_url: {}
    anomaly_model: {}
    sequence_model: {}
    api_key: {}
  Gemini:
    base_url: {}
    model: {}
    regulator: {}
    api_key: {}
  Logging:
    level: {}
    format: {:?}
"#,
            self.retry.max_attempts,
            self.retry.delay_ms,
            self.orchestrator.call_timeout_ms,
            self.orchestrator.sequential,
            mask_url(&self.huggingface.base_url),
            self.huggingface.anomaly_model,
            self.huggingface.sequence_model,
            mask_secret(&self.huggingface.api_key),
            mask_url(&self.gemini.base_url),
            self.gemini.model,
            self.gemini.regulator,
            mask_secret(&self.gemini.api_key),
            self.logging.level,
            self.logging.format,
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

fn mask_secret(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "***"
    }
}
