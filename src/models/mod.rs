//! Data models for the `MeteoAgent` application
//!
//! Transient values that live for a single user turn:
//! - Place: geocoded coordinates and timezone
//! - Weather: current conditions and WMO code lookup
//! - Tool calls: invocations requested by the model and their results

pub mod place;
pub mod tool_call;
pub mod weather;

pub use place::{DEFAULT_TIMEZONE, Place};
pub use tool_call::{ToolArguments, ToolInvocation, ToolResult};
pub use weather::{WeatherReading, wmo_description};
