//! Configuration loading, validation, and management for Parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the generative-language API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Sampling parameters
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Safety filter settings
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Conversation history settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// System preamble
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Connectivity probing
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("generation", &self.generation)
            .field("safety", &self.safety)
            .field("history", &self.history)
            .field("prompt", &self.prompt)
            .field("connectivity", &self.connectivity)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_top_k() -> u32 {
    40
}
fn default_top_p() -> f32 {
    0.95
}
fn default_max_output_tokens() -> u32 {
    2048
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Block threshold applied to every category below
    #[serde(default = "default_safety_threshold")]
    pub threshold: String,

    #[serde(default = "default_safety_categories")]
    pub categories: Vec<String>,
}

fn default_safety_threshold() -> String {
    "BLOCK_MEDIUM_AND_ABOVE".into()
}
fn default_safety_categories() -> Vec<String> {
    vec![
        "HARM_CATEGORY_HARASSMENT".into(),
        "HARM_CATEGORY_HATE_SPEECH".into(),
        "HARM_CATEGORY_SEXUALLY_EXPLICIT".into(),
        "HARM_CATEGORY_DANGEROUS_CONTENT".into(),
    ]
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            threshold: default_safety_threshold(),
            categories: default_safety_categories(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum retained messages
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Most recent messages sent as context
    #[serde(default = "default_window")]
    pub window: usize,

    /// Store key for the serialized log
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Directory for the file store (default: `~/.parley/data`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

fn default_capacity() -> usize {
    10_000
}
fn default_window() -> usize {
    40
}
fn default_storage_key() -> String {
    "ai_chat_messages".into()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            window: default_window(),
            storage_key: default_storage_key(),
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_acknowledgement")]
    pub acknowledgement: String,
}

fn default_system_prompt() -> String {
    concat!(
        "You are a smart AI that answers in a relaxed, friendly, and clear style. ",
        "Give responses that are helpful, accurate, and easy to understand. ",
        "When asked to explain something complex, use examples or relatable analogies. ",
        "Always keep a positive and supportive tone.",
    )
    .into()
}
fn default_acknowledgement() -> String {
    "Understood. I will respond in a friendly, casual, and clear manner as requested.".into()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            acknowledgement: default_acknowledgement(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Probe the network; when off, the client always assumes it is online
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_probe_host")]
    pub probe_host: String,

    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    #[serde(default = "default_probe_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_probe_host() -> String {
    "generativelanguage.googleapis.com".into()
}
fn default_probe_port() -> u16 {
    443
}
fn default_probe_interval_secs() -> u64 {
    15
}
fn default_probe_timeout_secs() -> u64 {
    3
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probe_host: default_probe_host(),
            probe_port: default_probe_port(),
            interval_secs: default_probe_interval_secs(),
            timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.parley/config.toml).
    ///
    /// Also checks environment variables:
    /// - `PARLEY_API_KEY` (highest priority), then `GEMINI_API_KEY`
    /// - `PARLEY_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("PARLEY_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok())
                .filter(|k| !k.is_empty());
        }

        if let Ok(model) = std::env::var("PARLEY_MODEL") {
            config.model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Directory the file store writes into.
    pub fn data_dir(&self) -> PathBuf {
        match &self.history.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => Self::config_dir().join("data"),
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let generation = &self.generation;
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if generation.top_p <= 0.0 || generation.top_p > 1.0 {
            return Err(ConfigError::ValidationError(
                "generation.top_p must be in (0.0, 1.0]".into(),
            ));
        }
        if generation.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_output_tokens must be > 0".into(),
            ));
        }
        if self.history.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "history.capacity must be > 0".into(),
            ));
        }
        if self.history.window == 0 {
            return Err(ConfigError::ValidationError(
                "history.window must be > 0".into(),
            ));
        }
        if self.history.storage_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "history.storage_key must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            generation: GenerationConfig::default(),
            safety: SafetyConfig::default(),
            history: HistoryConfig::default(),
            prompt: PromptConfig::default(),
            connectivity: ConnectivityConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.history.capacity, 10_000);
        assert_eq!(config.history.window, 40);
        assert_eq!(config.history.storage_key, "ai_chat_messages");
        assert_eq!(config.generation.top_k, 40);
        assert_eq!(config.safety.categories.len(), 4);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.history.capacity, config.history.capacity);
        assert_eq!(parsed.prompt.acknowledgement, config.prompt.acknowledgement);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            generation: GenerationConfig {
                temperature: 5.0,
                ..GenerationConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.history.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().model, "gemini-2.0-flash");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            r#"
model = "gemini-1.5-pro"

[history]
capacity = 500

[prompt]
system_prompt = "Answer like a pirate."
"#
        )
        .unwrap();

        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.history.capacity, 500);
        assert_eq!(config.history.window, 40);
        assert_eq!(config.prompt.system_prompt, "Answer like a pirate.");
        assert_eq!(config.prompt.acknowledgement, default_acknowledgement());
    }

    #[test]
    fn invalid_file_reports_validation_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[history]\nwindow = 0").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn unparseable_file_reports_parse_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "model = [not toml").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("secret-key-123".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key-123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn data_dir_override() {
        let mut config = AppConfig::default();
        assert!(config.data_dir().ends_with("data"));
        config.history.data_dir = Some("/var/lib/parley".into());
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/parley"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini-2.0-flash"));
        assert!(toml_str.contains("ai_chat_messages"));
    }
}
