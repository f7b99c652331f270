//! The tool-call loop
//!
//! One user turn: send the text, answer every function call the model asks
//! for, and stop at the first reply that requests none. Failures anywhere in
//! the turn are caught here so the interactive session survives them.

use crate::config::AgentConfig;
use crate::llm::{ChatMessage, ChatSession, GeminiSession, ModelReply};
use crate::models::ToolResult;
use crate::tools::Toolbox;
use crate::{AgentError, Result};
use tracing::{debug, info, instrument, warn};

/// A conversational assistant backed by a chat session and the toolbox
pub struct Agent<S> {
    session: S,
    toolbox: Toolbox,
    max_tool_rounds: usize,
}

impl Agent<GeminiSession> {
    /// Build the production agent: Gemini plus the `OpenMeteo`/`DuckDuckGo` tools
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let client = config.http_client()?;
        let session = GeminiSession::new(client.clone(), &config.llm, api_key);
        let toolbox = Toolbox::from_config(config, &client);
        Ok(Self::new(session, toolbox, config.agent.max_tool_rounds))
    }
}

impl<S: ChatSession> Agent<S> {
    /// Create an agent; the toolbox declarations are registered with the session
    pub fn new(mut session: S, toolbox: Toolbox, max_tool_rounds: usize) -> Self {
        session.set_tools(toolbox.declarations());
        Self {
            session,
            toolbox,
            max_tool_rounds,
        }
    }

    #[must_use]
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Answer one user message
    ///
    /// Never fails: errors come back as `Error encountered: {message}`.
    /// A failed turn leaves no trace in the session, so half-answered
    /// function calls are never replayed.
    pub async fn query(&mut self, input: &str) -> String {
        let checkpoint = self.session.checkpoint();
        match self.run_turn(input).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Turn failed: {}", e);
                self.session.rollback(checkpoint);
                format!("Error encountered: {e}")
            }
        }
    }

    #[instrument(skip(self))]
    async fn run_turn(&mut self, input: &str) -> Result<String> {
        let mut reply = self.session.send(ChatMessage::User(input.to_string())).await?;
        let mut rounds = 0;

        while reply.requests_tools() {
            rounds += 1;
            if rounds > self.max_tool_rounds {
                return Err(AgentError::llm(format!(
                    "Model kept calling tools after {} rounds",
                    self.max_tool_rounds
                )));
            }

            let responses = self.answer_calls(&reply).await?;
            reply = self
                .session
                .send(ChatMessage::FunctionResponses(responses))
                .await?;
        }

        info!("Turn finished after {} tool round(s)", rounds);
        Ok(reply.text)
    }

    async fn answer_calls(&self, reply: &ModelReply) -> Result<Vec<ToolResult>> {
        let mut responses = Vec::with_capacity(reply.function_calls.len());
        for invocation in &reply.function_calls {
            let result = self.toolbox.dispatch(invocation).await?;
            debug!("{} -> {}", result.name, result.result_text);
            responses.push(result);
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Place, ToolInvocation, WeatherReading};
    use crate::search::SearchHit;
    use crate::testing::{FakeGeocoder, FakeSearch, FakeWeather, ScriptedSession, paris, toolbox_with};

    fn tokyo_weather() -> std::sync::Arc<FakeWeather> {
        FakeWeather::reading(WeatherReading {
            temperature: 21.0,
            unit: "°C".to_string(),
            wmo_code: 61,
        })
    }

    #[tokio::test]
    async fn test_plain_answer_without_tools() {
        let session = ScriptedSession::new([Ok(ModelReply::text("Hello!"))]);
        let toolbox = toolbox_with(
            FakeGeocoder::found(paris()),
            FakeWeather::empty(),
            FakeSearch::with_hits(vec![]),
        );
        let mut agent = Agent::new(session, toolbox, 8);

        assert_eq!(agent.query("hi").await, "Hello!");
        assert_eq!(agent.session().sent, vec![ChatMessage::User("hi".to_string())]);
        assert_eq!(
            agent.session().declared_tools,
            ["get_weather", "get_current_time", "search_web"]
        );
    }

    #[tokio::test]
    async fn test_single_weather_dispatch() {
        let tokyo = Place::new(35.69, 139.69, "Tokyo").with_timezone("Asia/Tokyo");
        let geocoder = FakeGeocoder::found(tokyo);
        let weather = tokyo_weather();
        let session = ScriptedSession::new([
            Ok(ModelReply::call(ToolInvocation::new("get_weather", [("city", "Tokyo")]))),
            Ok(ModelReply::text("It's rainy in Tokyo, 21 degrees.")),
        ]);
        let toolbox = toolbox_with(geocoder.clone(), weather.clone(), FakeSearch::with_hits(vec![]));
        let mut agent = Agent::new(session, toolbox, 8);

        let answer = agent.query("What's the weather in Tokyo?").await;

        assert_eq!(answer, "It's rainy in Tokyo, 21 degrees.");
        assert_eq!(weather.calls(), 1);
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(
            agent.session().sent,
            vec![
                ChatMessage::User("What's the weather in Tokyo?".to_string()),
                ChatMessage::FunctionResponses(vec![ToolResult::new(
                    "get_weather",
                    "Weather in Tokyo: Rain, 21.0 °C"
                )]),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_keeps_turn_alive() {
        let session = ScriptedSession::new([
            Ok(ModelReply::call(ToolInvocation::new("book_flight", [("to", "Rome")]))),
            Ok(ModelReply::text("I can't book flights.")),
        ]);
        let toolbox = toolbox_with(
            FakeGeocoder::found(paris()),
            FakeWeather::empty(),
            FakeSearch::with_hits(vec![]),
        );
        let mut agent = Agent::new(session, toolbox, 8);

        assert_eq!(agent.query("Book me a flight").await, "I can't book flights.");
        assert_eq!(
            agent.session().sent[1],
            ChatMessage::FunctionResponses(vec![ToolResult::new("book_flight", "Unknown tool")])
        );
    }

    #[tokio::test]
    async fn test_chained_and_parallel_calls() {
        let session = ScriptedSession::new([
            Ok(ModelReply::call(ToolInvocation::new("search_web", [("query", "Paris events")]))),
            Ok(ModelReply {
                text: String::new(),
                function_calls: vec![
                    ToolInvocation::new("get_current_time", [("city", "Paris")]),
                    ToolInvocation::new("get_weather", [("city", "Paris")]),
                ],
            }),
            Ok(ModelReply::text("Done.")),
        ]);
        let weather = FakeWeather::empty();
        let toolbox = toolbox_with(
            FakeGeocoder::found(paris()),
            weather.clone(),
            FakeSearch::with_hits(vec![SearchHit::new("Fête", "music everywhere")]),
        );
        let mut agent = Agent::new(session, toolbox, 8);

        assert_eq!(agent.query("What's on in Paris?").await, "Done.");
        assert_eq!(weather.calls(), 1);
        assert_eq!(
            agent.session().sent[1],
            ChatMessage::FunctionResponses(vec![ToolResult::new(
                "search_web",
                "1. Fête: music everywhere"
            )])
        );
        assert_eq!(
            agent.session().sent[2],
            ChatMessage::FunctionResponses(vec![
                ToolResult::new(
                    "get_current_time",
                    "Current time in Paris (Europe/Paris): 2024-07-01 14:00:00"
                ),
                ToolResult::new("get_weather", "Could not get weather data for Paris."),
            ])
        );
    }

    #[tokio::test]
    async fn test_session_error_is_rendered() {
        let session = ScriptedSession::new([Err(AgentError::llm("quota exceeded"))]);
        let toolbox = toolbox_with(
            FakeGeocoder::found(paris()),
            FakeWeather::empty(),
            FakeSearch::with_hits(vec![]),
        );
        let mut agent = Agent::new(session, toolbox, 8);

        assert_eq!(
            agent.query("hi").await,
            "Error encountered: Model error: quota exceeded"
        );
        // The next turn still works on the same agent and starts from the
        // checkpoint taken after the failed message was recorded.
        assert_eq!(
            agent.query("hi again").await,
            "Error encountered: Model error: script exhausted"
        );
        assert_eq!(agent.session().rollbacks, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_missing_argument_fails_turn() {
        let session = ScriptedSession::new([Ok(ModelReply::call(ToolInvocation::new(
            "get_weather",
            [("town", "Paris")],
        )))]);
        let toolbox = toolbox_with(
            FakeGeocoder::found(paris()),
            FakeWeather::empty(),
            FakeSearch::with_hits(vec![]),
        );
        let mut agent = Agent::new(session, toolbox, 8);

        assert_eq!(
            agent.query("weather?").await,
            "Error encountered: Invalid input: Missing argument 'city' for get_weather"
        );
        assert_eq!(agent.session().sent.len(), 1);
        assert_eq!(agent.session().rollbacks, vec![0]);
    }

    #[tokio::test]
    async fn test_successful_turn_keeps_history() {
        let session = ScriptedSession::new([
            Ok(ModelReply::text("first")),
            Ok(ModelReply::text("second")),
        ]);
        let toolbox = toolbox_with(
            FakeGeocoder::found(paris()),
            FakeWeather::empty(),
            FakeSearch::with_hits(vec![]),
        );
        let mut agent = Agent::new(session, toolbox, 8);

        assert_eq!(agent.query("one").await, "first");
        assert_eq!(agent.query("two").await, "second");
        assert!(agent.session().rollbacks.is_empty());
    }

    #[tokio::test]
    async fn test_tool_round_limit() {
        let call = || -> Result<ModelReply> {
            Ok(ModelReply::call(ToolInvocation::new("get_time", [("city", "x")])))
        };
        let session = ScriptedSession::new([call(), call(), call()]);
        let toolbox = toolbox_with(
            FakeGeocoder::found(paris()),
            FakeWeather::empty(),
            FakeSearch::with_hits(vec![]),
        );
        let mut agent = Agent::new(session, toolbox, 2);

        let answer = agent.query("loop forever").await;

        assert!(answer.starts_with("Error encountered: Model error: Model kept calling tools"));
        assert_eq!(agent.session().sent.len(), 3);
        assert_eq!(agent.session().rollbacks, vec![0]);
    }
}
