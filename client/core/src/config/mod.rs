//! TOML Configuration File Support
//!
//! Configuration for the chat client, read from
//! `$XDG_CONFIG_HOME/crossclaw/client.toml` (typically
//! `~/.config/crossclaw/client.toml`).
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! url = "http://localhost:8000"
//!
//! [chat]
//! default_model = "gemini/gemini-2.5-flash"
//! temperature = 0.7
//! system_prompt = "You are a concise assistant."
//!
//! [transport]
//! outbound_capacity = 64
//! ```

use std::path::PathBuf;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::ChatSettings;
use crate::transport::TransportConfig;

/// Backend base URL
pub const ENV_SERVER_URL: &str = "CROSSCLAW_SERVER_URL";
/// Model used for new conversations and sends
pub const ENV_DEFAULT_MODEL: &str = "CROSSCLAW_DEFAULT_MODEL";
/// Sampling temperature
pub const ENV_TEMPERATURE: &str = "CROSSCLAW_TEMPERATURE";
/// System prompt sent with every message
pub const ENV_SYSTEM_PROMPT: &str = "CROSSCLAW_SYSTEM_PROMPT";

/// Accepted temperature range
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=2.0;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Backend base URL (`http` or `https`)
    pub url: Option<String>,
}

/// Chat section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Model for new conversations and sends
    pub default_model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f64>,

    /// System prompt sent with every message
    pub system_prompt: Option<String>,
}

/// Transport section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// Outbound frames buffered per connection
    pub outbound_capacity: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Server section
    pub server: ServerToml,

    /// Chat section
    pub chat: ChatToml,

    /// Transport section
    pub transport: TransportToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved client configuration
///
/// Use [`load_config`] to build one with proper priority handling.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Streaming transport settings (server URL, buffering)
    pub transport: TransportConfig,

    /// Per-message chat settings
    pub chat: ChatSettings,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            chat: ChatSettings::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration pointing at the given backend, defaults elsewhere
    #[must_use]
    pub fn for_server(server_url: Url) -> Self {
        Self {
            transport: TransportConfig::new(server_url),
            ..Self::default()
        }
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Backend base URL
    #[must_use]
    pub fn server_url(&self) -> &Url {
        &self.transport.server_url
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a non-HTTP server URL,
    /// a temperature outside `0.0..=2.0` or a zero outbound capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme = self.transport.server_url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::ValidationError(format!(
                "server url must use http or https, got {scheme}"
            )));
        }
        if !TEMPERATURE_RANGE.contains(&self.chat.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.chat.temperature
            )));
        }
        if self.transport.outbound_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "outbound_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/crossclaw/client.toml` or
/// `~/.config/crossclaw/client.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("crossclaw").join("client.toml"))
}

/// Load configuration from the default file and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resolved values fail validation. A missing config file is not an
/// error (defaults are used).
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the resolved values fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env)?;
    config.validate()?;

    Ok(config)
}

fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw)
        .map_err(|e| ConfigError::ValidationError(format!("invalid server url {raw:?}: {e}")))
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) -> Result<(), ConfigError> {
    if let Some(ref url) = toml.server.url {
        config.transport.server_url = parse_server_url(url)?;
    }

    if let Some(ref model) = toml.chat.default_model {
        config.chat.default_model.clone_from(model);
    }
    if let Some(temperature) = toml.chat.temperature {
        config.chat.temperature = temperature;
    }
    if toml.chat.system_prompt.is_some() {
        config.chat.system_prompt.clone_from(&toml.chat.system_prompt);
    }

    if let Some(capacity) = toml.transport.outbound_capacity {
        config.transport.outbound_capacity = capacity;
    }
    Ok(())
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut ClientConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(ENV_SERVER_URL) {
        config.transport.server_url = parse_server_url(&url)?;
        config.source = ConfigSource::Env;
    }
    if let Some(model) = env(ENV_DEFAULT_MODEL) {
        config.chat.default_model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(temperature) = env(ENV_TEMPERATURE) {
        match temperature.parse::<f64>() {
            Ok(value) => {
                config.chat.temperature = value;
                config.source = ConfigSource::Env;
            }
            Err(_) => {
                tracing::warn!(value = %temperature, "Ignoring unparsable {ENV_TEMPERATURE}");
            }
        }
    }
    if let Some(prompt) = env(ENV_SYSTEM_PROMPT) {
        config.chat.system_prompt = Some(prompt);
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Configuration overrides from CLI arguments
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Server URL override
    pub server_url: Option<Url>,

    /// Default model override
    pub default_model: Option<String>,

    /// Temperature override
    pub temperature: Option<f64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set server URL override
    #[must_use]
    pub fn with_server_url(mut self, url: Url) -> Self {
        self.server_url = Some(url);
        self
    }

    /// Set default model override
    #[must_use]
    pub fn with_default_model(mut self, model: String) -> Self {
        self.default_model = Some(model);
        self
    }

    /// Set temperature override
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Apply overrides to a configuration and re-validate it
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override puts the
    /// configuration out of range.
    pub fn apply(&self, config: &mut ClientConfig) -> Result<(), ConfigError> {
        if self.server_url.is_some() || self.default_model.is_some() || self.temperature.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.server_url {
            config.transport.server_url = url.clone();
        }
        if let Some(ref model) = self.default_model {
            config.chat.default_model.clone_from(model);
        }
        if let Some(temperature) = self.temperature {
            config.chat.temperature = temperature;
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
