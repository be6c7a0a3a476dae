use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::models::chat::{ChatResponse, CompletionEvent};
use crate::models::message::Message;
use crate::models::tool::Tool;

/// How the model is allowed to pick tools on a completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    Any,
    None,
}

/// An asynchronous, lazily produced sequence of completion events.
/// Finite but unbounded in length; each element may or may not carry a
/// text delta.
pub type EventStream = BoxStream<'static, Result<CompletionEvent, ProviderError>>;

/// Base trait for chat-completion providers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate one complete response for the conversation, advertising
    /// the given tools
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: Option<ToolChoice>,
    ) -> Result<ChatResponse, ProviderError>;

    /// Generate a response as a stream of incremental events
    async fn complete_stream(&self, messages: &[Message]) -> Result<EventStream, ProviderError>;

    /// Embed a batch of text inputs, one vector per input, in input order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}
