//! Error types and handling for the `MeteoAgent` application

use thiserror::Error;

/// Main error type for the `MeteoAgent` library
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream API answered, but not with something usable
    #[error("API error: {message}")]
    Api { message: String },

    /// Transport or body decoding failures from the HTTP client
    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// Language model provider errors
    #[error("Model error: {message}")]
    Llm { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AgentError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new model provider error
    pub fn llm<S: Into<String>>(message: S) -> Self {
        Self::Llm {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            AgentError::Api { .. } | AgentError::Http { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            AgentError::Llm { message } => format!("The language model failed: {message}"),
            AgentError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            AgentError::Io { .. } => "I/O operation failed.".to_string(),
        }
    }
}
