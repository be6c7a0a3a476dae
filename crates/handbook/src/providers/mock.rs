use async_trait::async_trait;
use futures::stream;
use std::sync::Arc;
use std::sync::Mutex;

use super::base::{EventStream, Provider, ToolChoice};
use crate::errors::ProviderError;
use crate::models::chat::{ChatResponse, Choice, CompletionEvent, FinishReason};
use crate::models::message::{Message, ToolCallRequest};
use crate::models::tool::Tool;

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<Vec<ChatResponse>>>,
    events: Arc<Mutex<Vec<Result<CompletionEvent, ProviderError>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of completion responses
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script the events served by the next `complete_stream` call
    pub fn with_events(mut self, events: Vec<Result<CompletionEvent, ProviderError>>) -> Self {
        self.events = Arc::new(Mutex::new(events));
        self
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[Tool],
        _tool_choice: Option<ToolChoice>,
    ) -> Result<ChatResponse, ProviderError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return an empty response if no more pre-configured responses
            Ok(assistant_response(""))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn complete_stream(&self, _messages: &[Message]) -> Result<EventStream, ProviderError> {
        let events: Vec<_> = self.events.lock().unwrap().drain(..).collect();
        Ok(Box::pin(stream::iter(events)))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(inputs
            .iter()
            .enumerate()
            .map(|(i, _)| vec![i as f32, 0.5, -0.5])
            .collect())
    }
}

/// A complete response with a single text choice finishing on "stop"
pub fn assistant_response<S: Into<String>>(content: S) -> ChatResponse {
    ChatResponse {
        id: None,
        model: None,
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(content),
            finish_reason: FinishReason::Stop,
        }],
        usage: None,
    }
}

/// A complete response whose single choice requests one tool call
pub fn tool_call_response<I, N, A>(id: I, name: N, arguments: A) -> ChatResponse
where
    I: Into<String>,
    N: Into<String>,
    A: Into<String>,
{
    ChatResponse {
        id: None,
        model: None,
        choices: vec![Choice {
            index: 0,
            message: Message::assistant("")
                .with_tool_calls(vec![ToolCallRequest::new(id, name, arguments)]),
            finish_reason: FinishReason::ToolCalls,
        }],
        usage: None,
    }
}

/// An event carrying a single text delta
pub fn delta_event<S: Into<String>>(content: S) -> CompletionEvent {
    CompletionEvent {
        id: None,
        choices: vec![crate::models::chat::EventChoice {
            index: 0,
            delta: crate::models::chat::Delta {
                role: None,
                content: Some(content.into()),
            },
            finish_reason: None,
        }],
        usage: None,
    }
}
