//! `MeteoAgent` - a conversational weather, time and web-search assistant
//!
//! The library wires a hosted language model to three tools (current
//! weather, local time, web search) through an explicit tool-call loop.

pub mod agent;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod llm;
pub mod logging;
pub mod models;
pub mod search;
pub mod time;
pub mod tools;
pub mod weather;

#[cfg(test)]
mod testing;

// Re-export core types for public API
pub use agent::Agent;
pub use config::AgentConfig;
pub use error::AgentError;
pub use geocoding::{Geocoder, OpenMeteoGeocoder};
pub use llm::{ChatMessage, ChatSession, GeminiSession, ModelReply};
pub use models::{Place, ToolInvocation, ToolResult, WeatherReading};
pub use search::{DuckDuckGoSearch, SearchHit, SearchProvider, SearchTool};
pub use time::{Clock, FixedClock, SystemClock, TimeTool};
pub use tools::{Tool, ToolKind, Toolbox};
pub use weather::{CurrentWeatherSource, OpenMeteoForecast, WeatherTool};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AgentError>;
