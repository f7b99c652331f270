//! Gemini `generateContent` client
//!
//! Keeps the conversation history client-side and replays it on every
//! request, the way the REST API expects.

use super::{ChatMessage, ChatSession, ModelReply};
use crate::config::LlmConfig;
use crate::models::ToolInvocation;
use crate::tools::FunctionDeclaration;
use crate::{AgentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// A chat with one Gemini model
pub struct GeminiSession {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    system_instruction: Option<String>,
    tools: Vec<FunctionDeclaration>,
    history: Vec<Content>,
}

impl GeminiSession {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: api_key.into(),
            system_instruction: config.system_instruction.clone(),
            tools: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Number of turns (both roles) recorded so far
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn request_body(&self) -> GenerateContentRequest<'_> {
        GenerateContentRequest {
            contents: &self.history,
            tools: (!self.tools.is_empty()).then(|| {
                vec![ToolSet {
                    function_declarations: &self.tools,
                }]
            }),
            system_instruction: self.system_instruction.as_deref().map(|text| Content {
                role: None,
                parts: vec![Part::text(text)],
            }),
        }
    }

    async fn generate(&self) -> Result<Content> {
        let start_time = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&self.request_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(AgentError::llm(format!("{status}: {detail}")));
        }

        let body: GenerateContentResponse = response.json().await?;
        debug!(
            "Gemini answered in {:.3}s",
            start_time.elapsed().as_secs_f64()
        );

        let Some(candidate) = body.candidates.into_iter().next() else {
            let reason = body
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(AgentError::llm(format!("Model returned no answer: {reason}")));
        };

        let finish_reason = candidate.finish_reason;
        let mut content = match candidate.content {
            Some(content) if !content.parts.is_empty() => content,
            _ => {
                return Err(AgentError::llm(format!(
                    "Model returned no content (finish reason: {})",
                    finish_reason.as_deref().unwrap_or("unspecified")
                )));
            }
        };
        if content.role.is_none() {
            content.role = Some("model".to_string());
        }
        Ok(content)
    }
}

#[async_trait]
impl ChatSession for GeminiSession {
    fn set_tools(&mut self, declarations: Vec<FunctionDeclaration>) {
        self.tools = declarations;
    }

    #[instrument(skip_all)]
    async fn send(&mut self, message: ChatMessage) -> Result<ModelReply> {
        self.history.push(Content::from(message));

        match self.generate().await {
            Ok(content) => {
                let reply = content.to_reply();
                self.history.push(content);
                info!(
                    "Model replied with {} function call(s)",
                    reply.function_calls.len()
                );
                Ok(reply)
            }
            Err(e) => {
                // A failed exchange must not leave a dangling user turn behind.
                self.history.pop();
                warn!("Gemini request failed: {}", e);
                Err(e)
            }
        }
    }

    fn checkpoint(&self) -> usize {
        self.history.len()
    }

    fn rollback(&mut self, checkpoint: usize) {
        if checkpoint < self.history.len() {
            debug!(
                "Dropping {} history entries from a failed turn",
                self.history.len() - checkpoint
            );
            self.history.truncate(checkpoint);
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSet<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSet<'a> {
    function_declarations: &'a [FunctionDeclaration],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

/// One part of a content block
///
/// Fields this client does not model (thought signatures and the like) are
/// kept in `extra` so they are replayed untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    fn is_thought(&self) -> bool {
        self.extra.get("thought").and_then(Value::as_bool) == Some(true)
    }
}

impl From<ChatMessage> for Content {
    fn from(message: ChatMessage) -> Self {
        let parts = match message {
            ChatMessage::User(text) => vec![Part::text(text)],
            ChatMessage::FunctionResponses(results) => results
                .into_iter()
                .map(|result| Part {
                    function_response: Some(FunctionResponse {
                        name: result.name,
                        response: json!({ "result": result.result_text }),
                    }),
                    ..Part::default()
                })
                .collect(),
        };

        Content {
            role: Some("user".to_string()),
            parts,
        }
    }
}

impl Content {
    fn to_reply(&self) -> ModelReply {
        let text = self
            .parts
            .iter()
            .filter(|part| !part.is_thought())
            .filter_map(|part| part.text.as_deref())
            .collect::<String>();

        let function_calls = self
            .parts
            .iter()
            .filter_map(|part| part.function_call.as_ref())
            .map(|call| ToolInvocation::from_json_args(&call.name, &call.args))
            .collect();

        ModelReply {
            text,
            function_calls,
        }
    }
}
