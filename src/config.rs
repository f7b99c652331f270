//! Configuration management for the `MeteoAgent` application
//!
//! Handles loading configuration from files, `.env` and environment variables,
//! and provides validation for all configuration settings. The loaded
//! [`AgentConfig`] is built once at startup and handed to every client.

use crate::AgentError;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Conventional environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Root configuration structure for the `MeteoAgent` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Language model provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Geocoding API configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Forecast API configuration
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Web search configuration
    #[serde(default)]
    pub search: SearchConfig,
    /// Tool-call loop settings
    #[serde(default)]
    pub agent: LoopConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Language model provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key for the model provider
    pub api_key: Option<String>,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the generative language API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Optional system instruction sent with every request
    pub system_instruction: Option<String>,
    /// Request timeout in seconds; unset keeps the transport default
    pub timeout_seconds: Option<u64>,
}

/// Geocoding API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL; `/search` is appended
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
}

/// Forecast API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Base URL; `/forecast` is appended
    #[serde(default = "default_forecast_base_url")]
    pub base_url: String,
}

/// Web search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the search provider
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    /// Maximum number of results handed back to the model
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

/// Tool-call loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Maximum consecutive function calls answered within one turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_forecast_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_search_base_url() -> String {
    "https://html.duckduckgo.com".to_string()
}

fn default_max_results() -> usize {
    3
}

fn default_max_tool_rounds() -> usize {
    8
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_llm_base_url(),
            system_instruction: None,
            timeout_seconds: None,
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: default_forecast_base_url(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            max_results: default_max_results(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the default file location and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    ///
    /// Sources, lowest precedence first: the TOML file, `METEO_AGENT__*`
    /// environment variables, then `GOOGLE_API_KEY` for a still-missing key.
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to read .env file"),
        }

        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            debug!("Reading configuration from {}", config_file.display());
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("METEO_AGENT")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AgentConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var(API_KEY_ENV).ok();
        }

        config.finish()
    }

    /// Parse configuration from a TOML document, without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: AgentConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.finish()
    }

    fn finish(mut self) -> Result<Self> {
        self.apply_defaults();
        self.validate()?;
        self.warn_if_missing_api_key();
        Ok(self)
    }

    /// Log a warning when no API key is configured; returns whether it is missing
    ///
    /// Loading already calls this, but a binary installs its subscriber only
    /// after loading and calls it again.
    pub fn warn_if_missing_api_key(&self) -> bool {
        let missing = self.llm.api_key.is_none();
        if missing {
            warn!("{API_KEY_ENV} environment variable not set.");
        }
        missing
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("meteo-agent").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.llm.model.is_empty() {
            self.llm.model = default_model();
        }
        if self.llm.base_url.is_empty() {
            self.llm.base_url = default_llm_base_url();
        }
        if self
            .llm
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            self.llm.api_key = None;
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.forecast.base_url.is_empty() {
            self.forecast.base_url = default_forecast_base_url();
        }
        if self.search.base_url.is_empty() {
            self.search.base_url = default_search_base_url();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> crate::Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// The API key, or a configuration error when none was supplied
    pub fn require_api_key(&self) -> crate::Result<&str> {
        self.llm
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::config(format!("{API_KEY_ENV} is not set")))
    }

    /// Build the shared HTTP client used by every upstream integration
    pub fn http_client(&self) -> crate::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            "meteo-agent/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(seconds) = self.llm.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        Ok(builder.build()?)
    }

    fn validate_numeric_ranges(&self) -> crate::Result<()> {
        if self.search.max_results == 0 || self.search.max_results > 10 {
            return Err(AgentError::config(
                "Search max results must be between 1 and 10",
            ));
        }

        if self.agent.max_tool_rounds == 0 || self.agent.max_tool_rounds > 64 {
            return Err(AgentError::config(
                "Max tool rounds must be between 1 and 64",
            ));
        }

        if self.llm.timeout_seconds == Some(0) {
            return Err(AgentError::config("LLM timeout cannot be zero seconds"));
        }

        Ok(())
    }

    fn validate_string_values(&self) -> crate::Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(AgentError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_log_formats = ["pretty", "compact"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(AgentError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            )));
        }

        for (label, url) in [
            ("LLM", &self.llm.base_url),
            ("Geocoding", &self.geocoding.base_url),
            ("Forecast", &self.forecast.base_url),
            ("Search", &self.search.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AgentError::config(format!(
                    "{label} base URL must be a valid HTTP or HTTPS URL"
                )));
            }
        }

        Ok(())
    }
}
