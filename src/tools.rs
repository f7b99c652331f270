//! The closed set of tools the model may call
//!
//! Every tool answers `{name, arguments}` with a result string. Dispatch
//! goes through [`ToolKind`], so adding a tool means adding a variant and
//! the compiler points at every match that has to learn about it.

use crate::config::AgentConfig;
use crate::geocoding::{Geocoder, OpenMeteoGeocoder};
use crate::models::{ToolArguments, ToolInvocation, ToolResult};
use crate::search::{DuckDuckGoSearch, SearchProvider, SearchTool};
use crate::time::{Clock, SystemClock, TimeTool};
use crate::weather::{CurrentWeatherSource, OpenMeteoForecast, WeatherTool};
use crate::{AgentError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Result text for a function call naming no known tool
pub const UNKNOWN_TOOL: &str = "Unknown tool";

/// Identifies one of the available tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Weather,
    Time,
    Search,
}

impl ToolKind {
    /// Every tool, in declaration order
    pub const ALL: [ToolKind; 3] = [ToolKind::Weather, ToolKind::Time, ToolKind::Search];

    /// Function name exposed to the model
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Weather => "get_weather",
            ToolKind::Time => "get_current_time",
            ToolKind::Search => "search_web",
        }
    }

    /// Exact-match lookup of a function name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The single string parameter each tool takes
    #[must_use]
    pub fn parameter(self) -> &'static str {
        match self {
            ToolKind::Weather | ToolKind::Time => "city",
            ToolKind::Search => "query",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Function declaration advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl FunctionDeclaration {
    /// Declaration for a tool taking one required string parameter
    #[must_use]
    pub fn single_string(kind: ToolKind, description: &str, parameter_description: &str) -> Self {
        let mut properties = Map::new();
        properties.insert(
            kind.parameter().to_string(),
            json!({
                "type": "string",
                "description": parameter_description,
            }),
        );

        Self {
            name: kind.name().to_string(),
            description: description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": [kind.parameter()],
            }),
        }
    }
}

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn declaration(&self) -> FunctionDeclaration;

    /// Runs the tool. Upstream failures are folded into the returned text;
    /// only malformed arguments are reported as errors.
    async fn call(&self, arguments: &ToolArguments) -> Result<String>;
}

/// Fetch the tool's required, non-empty string argument
pub fn required_argument(kind: ToolKind, arguments: &ToolArguments) -> Result<&str> {
    let parameter = kind.parameter();
    match arguments.get(parameter).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(AgentError::validation(format!(
            "Argument '{parameter}' for {kind} must not be empty"
        ))),
        None => Err(AgentError::validation(format!(
            "Missing argument '{parameter}' for {kind}"
        ))),
    }
}

/// One instance of every tool
pub struct Toolbox {
    weather: WeatherTool,
    time: TimeTool,
    search: SearchTool,
}

impl Toolbox {
    #[must_use]
    pub fn new(weather: WeatherTool, time: TimeTool, search: SearchTool) -> Self {
        Self {
            weather,
            time,
            search,
        }
    }

    /// Assemble the tools from trait objects sharing one geocoder
    #[must_use]
    pub fn from_parts(
        geocoder: Arc<dyn Geocoder>,
        forecast: Arc<dyn CurrentWeatherSource>,
        search: Arc<dyn SearchProvider>,
        clock: Arc<dyn Clock>,
        max_results: usize,
    ) -> Self {
        Self::new(
            WeatherTool::new(Arc::clone(&geocoder), forecast),
            TimeTool::new(geocoder, clock),
            SearchTool::new(search, max_results),
        )
    }

    /// Wire the production `OpenMeteo` and `DuckDuckGo` clients
    #[must_use]
    pub fn from_config(config: &AgentConfig, client: &reqwest::Client) -> Self {
        Self::from_parts(
            Arc::new(OpenMeteoGeocoder::new(
                client.clone(),
                &config.geocoding.base_url,
            )),
            Arc::new(OpenMeteoForecast::new(client.clone(), &config.forecast.base_url)),
            Arc::new(DuckDuckGoSearch::new(client.clone(), &config.search.base_url)),
            Arc::new(SystemClock),
            config.search.max_results,
        )
    }

    #[must_use]
    pub fn tool(&self, kind: ToolKind) -> &dyn Tool {
        match kind {
            ToolKind::Weather => &self.weather,
            ToolKind::Time => &self.time,
            ToolKind::Search => &self.search,
        }
    }

    /// Declarations for every tool, in [`ToolKind::ALL`] order
    #[must_use]
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        ToolKind::ALL
            .into_iter()
            .map(|kind| self.tool(kind).declaration())
            .collect()
    }

    /// Answer one function call
    ///
    /// Unmatched names are answered with [`UNKNOWN_TOOL`] rather than failing.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> Result<ToolResult> {
        let result_text = match ToolKind::from_name(&invocation.name) {
            Some(kind) => {
                info!("Calling {} with {:?}", kind, invocation.arguments);
                self.tool(kind).call(&invocation.arguments).await?
            }
            None => {
                warn!("Model requested unknown tool '{}'", invocation.name);
                UNKNOWN_TOOL.to_string()
            }
        };

        Ok(ToolResult::new(&invocation.name, result_text))
    }
}
