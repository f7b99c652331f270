//! Language model sessions
//!
//! A [`ChatSession`] owns the conversation with the model. The agent loop
//! only sends user text or function responses and looks at what comes back;
//! the history itself stays inside the session.

pub mod gemini;

use crate::Result;
use crate::models::{ToolInvocation, ToolResult};
use crate::tools::FunctionDeclaration;
use async_trait::async_trait;

pub use gemini::GeminiSession;

/// A message sent to the model
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    /// A line typed by the user
    User(String),
    /// Answers to every function call of the previous reply, in order
    FunctionResponses(Vec<ToolResult>),
}

/// What the model answered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Concatenated text parts (may be empty when only calls are present)
    pub text: String,
    /// Function calls requested by the model, in emission order
    pub function_calls: Vec<ToolInvocation>,
}

impl ModelReply {
    /// A final answer without function calls
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            function_calls: Vec::new(),
        }
    }

    /// A reply requesting a single function call
    #[must_use]
    pub fn call(invocation: ToolInvocation) -> Self {
        Self {
            text: String::new(),
            function_calls: vec![invocation],
        }
    }

    #[must_use]
    pub fn requests_tools(&self) -> bool {
        !self.function_calls.is_empty()
    }
}

/// A stateful conversation with a model
#[async_trait]
pub trait ChatSession: Send {
    /// Declare the functions the model may call for the rest of the session
    fn set_tools(&mut self, declarations: Vec<FunctionDeclaration>);

    /// Send one message and wait for the model's reply
    async fn send(&mut self, message: ChatMessage) -> Result<ModelReply>;

    /// Marker for the current end of the conversation
    fn checkpoint(&self) -> usize;

    /// Forget everything recorded after `checkpoint`
    fn rollback(&mut self, checkpoint: usize);
}
