//! Configuration
//!
//! TOML-based configuration: provider selection, API keys, model
//! defaults, executor endpoint and timeouts, chat settings. Includes
//! startup validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Configuration structures
// ---------------------------------------------------------------------------

/// Top-level configuration (maps to TOML).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbtalkConfig {
    /// Active provider name (currently only "gemini").
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Provider-specific configurations.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Query-executor service settings.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Chat turn settings.
    #[serde(default)]
    pub chat: ChatSettings,
}

fn default_provider() -> String {
    "gemini".to_string()
}

/// Per-provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: Option<ProviderConfig>,
}

/// Configuration for a single LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key. If absent, falls back to the environment variable.
    pub api_key: Option<String>,
    /// Default model name.
    pub model: Option<String>,
    /// Custom base URL (e.g. for a proxy).
    pub base_url: Option<String>,
}

/// Query-executor service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Base URL of the executor service.
    #[serde(default = "default_executor_url")]
    pub base_url: String,
    /// Per-call timeout in seconds (default 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry policy for transport failures (no retries by default).
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_url: default_executor_url(),
            timeout_secs: default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_executor_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts for transport failures (default 0 — off).
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_multiplier(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

fn default_base_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_multiplier() -> f64 {
    2.0
}

/// Chat turn settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Maximum tool-call rounds per turn (default 10).
    #[serde(default = "default_max_rounds")]
    pub max_tool_rounds: usize,
    /// Also expose `create_table` and `load_data` to the model.
    #[serde(default)]
    pub extended_tools: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_rounds(),
            extended_tools: false,
        }
    }
}

fn default_max_rounds() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

impl DbtalkConfig {
    /// Load config from the default location:
    /// `~/.config/dbtalk/config.toml`
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            info!("no config file found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        info!(path = %path.display(), provider = %config.provider, "loaded config");
        Ok(config)
    }

    /// Default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
        Ok(dir.join("dbtalk").join("config.toml"))
    }

    /// Resolve the API key for a provider, checking config and then env
    /// vars.
    pub fn resolve_api_key(&self, provider_name: &str) -> Option<String> {
        let config_key = match provider_name {
            "gemini" => self.providers.gemini.as_ref().and_then(|p| p.api_key.clone()),
            _ => None,
        };

        if config_key.is_some() {
            return config_key;
        }

        let env_var = match provider_name {
            "gemini" => "GOOGLE_API_KEY",
            _ => return None,
        };

        std::env::var(env_var).ok()
    }

    /// Get the model name for a provider.
    pub fn model_for_provider(&self, provider_name: &str) -> String {
        let configured = match provider_name {
            "gemini" => self.providers.gemini.as_ref().and_then(|p| p.model.clone()),
            _ => None,
        };

        configured.unwrap_or_else(|| match provider_name {
            "gemini" => "gemini-2.0-flash".to_string(),
            _ => "unknown".to_string(),
        })
    }

    /// Validate the config on startup.
    pub fn validate(&self) -> Result<()> {
        if self.provider != "gemini" {
            bail!(
                "unknown provider: '{}'. Expected: gemini",
                self.provider
            );
        }

        if self.resolve_api_key(&self.provider).is_none() {
            bail!(
                "No API key for provider '{}'. Set GOOGLE_API_KEY environment variable or add api_key under [providers.{}]",
                self.provider,
                self.provider
            );
        }

        if self.chat.max_tool_rounds == 0 {
            bail!("chat.max_tool_rounds must be at least 1");
        }

        Ok(())
    }
}

impl Default for DbtalkConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            providers: ProvidersConfig::default(),
            executor: ExecutorConfig::default(),
            chat: ChatSettings::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config generation (for `config init`)
// ---------------------------------------------------------------------------

/// Generate a sample config TOML string.
pub fn sample_config() -> String {
    r#"# dbtalk configuration

# Active LLM provider
provider = "gemini"

[providers.gemini]
# api_key = "..."  # Or set GOOGLE_API_KEY env var
model = "gemini-2.0-flash"

[executor]
base_url = "http://localhost:5000"
timeout_secs = 30

[executor.retry]
# Transport-failure retries are off by default.
max_retries = 0
base_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

[chat]
max_tool_rounds = 10
# Also expose create_table and load_data to the model.
extended_tools = false
"#
    .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
