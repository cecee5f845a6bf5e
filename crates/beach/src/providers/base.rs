use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::{Tool, ToolRequest};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// What the model produced for one call.
///
/// The shape is decided once when the provider parses its response; a reply
/// that requests tools carries no text worth showing.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Text(String),
    ToolCalls(Vec<ToolRequest>),
}

impl Completion {
    /// The reply text, if the model answered directly and said something.
    pub fn text(&self) -> Option<&str> {
        match self {
            Completion::Text(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }
}

/// Base trait for language-model providers (Ollama, OpenAI)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next reply for the conversation so far.
    ///
    /// `messages` already starts with the system prompt.
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<(Completion, Usage)>;
}
