//! Application configuration settings
//!
//! Defines all configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Number of numbered aggregator credential slots consulted at load time
pub const CREDENTIAL_SLOT_COUNT: usize = 9;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    pub server: ServerConfig,
    /// OpenRouter aggregator configuration
    pub openrouter: OpenRouterConfig,
    /// Completion gateway configuration
    pub gateway: GatewayConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
}

/// OpenRouter aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// API base URL
    pub base_url: String,
    /// Value for the HTTP-Referer attribution header
    pub site_url: String,
    /// Value for the X-Title attribution header
    pub site_name: String,
    /// Default model identifier when a request omits one
    pub default_model: String,
    /// Ordered credential slots; blank slots already filtered out
    pub api_keys: Vec<String>,
    /// Per-attempt request timeout in seconds
    pub timeout: u64,
    /// Streaming request timeout in seconds
    pub stream_timeout: u64,
}

/// Completion gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Maximum attempts per aggregator completion
    pub max_retries: u32,
    /// Sampling temperature sent upstream
    pub temperature: f32,
    /// Response length cap in tokens
    pub max_tokens: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Settings {
    /// Create a new configuration instance from the environment
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let settings = Self {
            server: ServerConfig {
                host: get_env_or_default("SERVER_HOST", "0.0.0.0"),
                port: get_env_or_default("SERVER_PORT", "8080")
                    .parse()
                    .context("Invalid port number")?,
            },
            openrouter: OpenRouterConfig {
                base_url: get_env_or_default("OPENROUTER_BASE_URL", "https://openrouter.ai/api/v1"),
                site_url: get_env_or_default("OPENROUTER_SITE_URL", "http://localhost:3000"),
                site_name: get_env_or_default("OPENROUTER_SITE_NAME", "chatgateway"),
                default_model: get_env_or_default(
                    "OPENROUTER_DEFAULT_MODEL",
                    "google/gemini-2.0-flash-exp:free",
                ),
                api_keys: load_credential_slots(),
                timeout: get_env_or_default("REQUEST_TIMEOUT", "30")
                    .parse()
                    .context("Invalid timeout value")?,
                stream_timeout: get_env_or_default("STREAM_TIMEOUT", "300")
                    .parse()
                    .context("Invalid stream timeout value")?,
            },
            gateway: GatewayConfig {
                max_retries: get_env_or_default("GATEWAY_MAX_RETRIES", "5")
                    .parse()
                    .context("Invalid max retries value")?,
                temperature: get_env_or_default("GATEWAY_TEMPERATURE", "0.7")
                    .parse()
                    .context("Invalid temperature value")?,
                max_tokens: get_env_or_default("GATEWAY_MAX_TOKENS", "1000")
                    .parse()
                    .context("Invalid max tokens value")?,
            },
            logging: LoggingConfig {
                level: get_env_or_default("RUST_LOG", "info"),
                format: get_env_or_default("LOG_FORMAT", "text"),
            },
        };

        // Validate configuration
        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Port number cannot be 0");
        }

        if !self.openrouter.base_url.starts_with("http") {
            anyhow::bail!("Invalid OpenRouter base URL format, should start with 'http'");
        }

        if self.openrouter.default_model.is_empty() {
            anyhow::bail!("Default model identifier cannot be empty");
        }

        if self.openrouter.timeout == 0 || self.openrouter.stream_timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        if self.gateway.max_retries == 0 {
            anyhow::bail!("Max retries cannot be 0");
        }

        if !(0.0..=2.0).contains(&self.gateway.temperature) {
            anyhow::bail!("Temperature must be between 0.0 and 2.0");
        }

        if self.gateway.max_tokens == 0 {
            anyhow::bail!("Max tokens cannot be 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        // An empty pool is not fatal at startup; the first aggregator-routed
        // completion will fail with NoCredentials instead.
        if self.openrouter.api_keys.is_empty() {
            warn!("No OpenRouter API keys configured; free-tier completions will fail");
        }

        Ok(())
    }
}

/// Read the ordered credential slots `OPENROUTER_API_KEY_1..9`,
/// skipping blank or absent entries while preserving slot order
fn load_credential_slots() -> Vec<String> {
    (1..=CREDENTIAL_SLOT_COUNT)
        .filter_map(|slot| env::var(format!("OPENROUTER_API_KEY_{}", slot)).ok())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .collect()
}

/// Get environment variable or default value
fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
