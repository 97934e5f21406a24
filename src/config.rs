//! Configuration management for chatledger
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChatLedgerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for chatledger
///
/// This structure holds all configuration needed for the client,
/// including the completion endpoint settings, usage accounting
/// behavior, and chat session limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Completion endpoint configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Usage accounting configuration
    #[serde(default)]
    pub usage: UsageConfig,

    /// Chat session configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Completion endpoint configuration
///
/// Specifies where completion requests are sent and the default
/// sampling parameters attached to each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the chat-completion endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Default model identifier sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum completion tokens per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Optional system prompt prepended to each conversation
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Whether the endpoint is allowed to execute tools
    #[serde(default)]
    pub enable_tools: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_endpoint() -> String {
    "http://localhost:8080/api/search/chat".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_timeout() -> u64 {
    300
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: None,
            enable_tools: false,
            timeout_seconds: default_timeout(),
        }
    }
}

/// Usage accounting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Prefer provider-reported token counts over the character heuristic
    ///
    /// When a completed turn carries a usage breakdown from the endpoint,
    /// those counts are recorded. When false (or when no breakdown arrived),
    /// tokens are estimated from the message length instead.
    #[serde(default = "default_prefer_authoritative")]
    pub prefer_authoritative_usage: bool,

    /// Characters per token used by the fallback estimator
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
}

fn default_prefer_authoritative() -> bool {
    true
}

fn default_chars_per_token() -> usize {
    4
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            prefer_authoritative_usage: default_prefer_authoritative(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum number of history messages sent with each request
    #[serde(default = "default_max_history")]
    pub max_history_messages: usize,

    /// Maximum length of auto-derived conversation titles
    #[serde(default = "default_title_len")]
    pub title_max_chars: usize,
}

fn default_max_history() -> usize {
    50
}

fn default_title_len() -> usize {
    60
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history_messages: default_max_history(),
            title_max_chars: default_title_len(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatLedgerError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatLedgerError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(endpoint) = std::env::var("CHATLEDGER_ENDPOINT") {
            self.api.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("CHATLEDGER_MODEL") {
            self.api.model = model;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(endpoint) = &cli.endpoint {
            self.api.endpoint = endpoint.clone();
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Returns
    ///
    /// Returns Ok if configuration is valid
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.is_empty() {
            return Err(ChatLedgerError::Config("api.endpoint cannot be empty".to_string()).into());
        }

        if !self.api.endpoint.starts_with("http://") && !self.api.endpoint.starts_with("https://") {
            return Err(ChatLedgerError::Config(format!(
                "api.endpoint must be an http(s) URL, got: {}",
                self.api.endpoint
            ))
            .into());
        }

        if self.api.model.is_empty() {
            return Err(ChatLedgerError::Config("api.model cannot be empty".to_string()).into());
        }

        if !(0.0..=2.0).contains(&self.api.temperature) {
            return Err(ChatLedgerError::Config(
                "api.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if self.api.max_tokens == 0 {
            return Err(
                ChatLedgerError::Config("api.max_tokens must be greater than 0".to_string()).into(),
            );
        }

        if self.api.timeout_seconds == 0 {
            return Err(ChatLedgerError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.usage.chars_per_token == 0 {
            return Err(ChatLedgerError::Config(
                "usage.chars_per_token must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.max_history_messages == 0 {
            return Err(ChatLedgerError::Config(
                "chat.max_history_messages must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            usage: UsageConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}
