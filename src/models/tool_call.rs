//! Tool invocations requested by the model and the results sent back

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Arguments of a tool call, keyed by parameter name
pub type ToolArguments = BTreeMap<String, String>;

/// A function call emitted by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the requested tool
    pub name: String,
    /// Flattened string arguments
    pub arguments: ToolArguments,
}

impl ToolInvocation {
    /// Create an invocation from string pairs
    #[must_use]
    pub fn new<N, I, K, V>(name: N, arguments: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build an invocation from the JSON `args` object of a function call
    ///
    /// Strings are kept verbatim, other values use their JSON rendering and
    /// `null` members are dropped.
    #[must_use]
    pub fn from_json_args(name: impl Into<String>, args: &Value) -> Self {
        let arguments = args
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(key, value)| {
                        let rendered = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (key.clone(), rendered)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Look up an argument by parameter name
    #[must_use]
    pub fn argument(&self, parameter: &str) -> Option<&str> {
        self.arguments.get(parameter).map(String::as_str)
    }
}

/// The textual answer to one [`ToolInvocation`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was requested
    pub name: String,
    /// Result text handed back to the model
    pub result_text: String,
}

impl ToolResult {
    /// Create a new tool result
    #[must_use]
    pub fn new(name: impl Into<String>, result_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result_text: result_text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_args_flattens_values() {
        let invocation = ToolInvocation::from_json_args(
            "get_weather",
            &json!({"city": "Tokyo", "days": 3, "detailed": true, "unit": null}),
        );

        assert_eq!(invocation.name, "get_weather");
        assert_eq!(invocation.argument("city"), Some("Tokyo"));
        assert_eq!(invocation.argument("days"), Some("3"));
        assert_eq!(invocation.argument("detailed"), Some("true"));
        assert_eq!(invocation.argument("unit"), None);
    }

    #[test]
    fn test_from_json_args_without_object() {
        let invocation = ToolInvocation::from_json_args("search_web", &Value::Null);
        assert!(invocation.arguments.is_empty());
    }

    #[test]
    fn test_new_collects_pairs() {
        let invocation = ToolInvocation::new("search_web", [("query", "rust news")]);
        assert_eq!(invocation.argument("query"), Some("rust news"));
    }
}
