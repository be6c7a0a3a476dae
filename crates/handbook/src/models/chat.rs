use serde::{Deserialize, Serialize};

use super::message::Message;
use super::role::Role;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Why the model stopped generating. Unknown tags are preserved rather
/// than rejected so a provider-side addition does not break parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ModelLength,
    Error,
    #[serde(untagged)]
    Other(String),
}

/// One alternative completion. Only the first choice is ever consulted
/// downstream; additional choices are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: Message,
    pub finish_reason: FinishReason,
}

/// A complete (non-streaming) chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The incremental payload of one streaming event. Role-only events carry
/// no content at all; empty-content events are also possible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// One event in a streaming chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<EventChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl CompletionEvent {
    /// The text delta of the first choice, if the event carries one.
    pub fn delta_content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_tags() {
        assert_eq!(
            serde_json::from_str::<FinishReason>("\"stop\"").unwrap(),
            FinishReason::Stop
        );
        assert_eq!(
            serde_json::from_str::<FinishReason>("\"tool_calls\"").unwrap(),
            FinishReason::ToolCalls
        );
        assert_eq!(
            serde_json::from_str::<FinishReason>("\"content_filter\"").unwrap(),
            FinishReason::Other("content_filter".to_string())
        );
    }

    #[test]
    fn test_parse_completion_event() {
        let event: CompletionEvent = serde_json::from_str(
            r#"{"id":"cmpl-1","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(event.delta_content(), Some("Hello"));
    }

    #[test]
    fn test_parse_role_only_event() {
        let event: CompletionEvent = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#,
        )
        .unwrap();
        assert_eq!(event.delta_content(), None);
    }
}
