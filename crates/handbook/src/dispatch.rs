//! The tool dispatch loop: one non-streaming request/response/tool-call/
//! re-request cycle against the model.
//!
//! Only the first choice and the first tool call of a response are honored;
//! parallel tool calls in the same response are ignored. No step is ever
//! retried — every failure propagates as a typed `DispatchError`.

use serde_json::Value;

use crate::errors::{DispatchError, ToolError};
use crate::models::chat::{ChatResponse, FinishReason};
use crate::models::message::Message;
use crate::providers::base::{Provider, ToolChoice};
use crate::tools::ToolRegistry;

/// Caller policy for a dispatch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Forwarded to the first completion call.
    pub tool_choice: Option<ToolChoice>,
    /// When set, the extended conversation is re-submitted after a tool
    /// invocation for a finalized natural-language answer. When unset, the
    /// raw tool result is the answer.
    pub resubmit: bool,
}

/// Terminal state of a dispatch run. Both variants carry the conversation
/// as it stood at the end, in append order.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The model produced a final text answer.
    Answered {
        answer: String,
        conversation: Vec<Message>,
    },
    /// A tool was invoked and its raw result is returned as the answer.
    ToolResult {
        function_name: String,
        arguments: Value,
        result: String,
        conversation: Vec<Message>,
    },
}

/// The first tool call of a response, with its arguments decoded.
#[derive(Debug, Clone)]
pub struct UnpackedCall {
    pub id: String,
    pub function_name: String,
    pub arguments: Value,
}

/// Decode the first tool call of a completed response.
///
/// Returns `Ok(None)` when the response did not finish on `tool_calls`.
/// Argument parsing happens here, before any registry lookup, so malformed
/// arguments fail even for functions that do not exist.
pub fn unpack_first_call(response: &ChatResponse) -> Result<Option<UnpackedCall>, DispatchError> {
    let choice = response.choices.first().ok_or(DispatchError::EmptyChoices)?;
    if choice.finish_reason != FinishReason::ToolCalls {
        return Ok(None);
    }

    let call = choice
        .message
        .tool_calls
        .first()
        .ok_or(DispatchError::NoToolCalls)?;

    let arguments: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
        ToolError::InvalidArguments(format!(
            "could not parse arguments for call {}: {}",
            call.id, e
        ))
    })?;

    Ok(Some(UnpackedCall {
        id: call.id.clone(),
        function_name: call.function.name.clone(),
        arguments,
    }))
}

/// Run the dispatch cycle over an already assembled conversation.
///
/// State machine: send the conversation once with the registry advertised;
/// finish `stop` answers directly, finish `tool_calls` invokes the first
/// requested function and appends its result as a tool message, optionally
/// followed by one re-submission. Any other finish reason is an error.
pub async fn run_dispatch(
    provider: &dyn Provider,
    registry: &ToolRegistry,
    mut conversation: Vec<Message>,
    options: DispatchOptions,
) -> Result<DispatchOutcome, DispatchError> {
    let response = provider
        .complete(&conversation, &registry.specs(), options.tool_choice)
        .await?;

    let choice = response
        .choices
        .first()
        .ok_or(DispatchError::EmptyChoices)?
        .clone();
    conversation.push(choice.message.clone());

    match choice.finish_reason {
        FinishReason::Stop => Ok(DispatchOutcome::Answered {
            answer: choice.message.content,
            conversation,
        }),
        FinishReason::ToolCalls => {
            let call = unpack_first_call(&response)?.ok_or(DispatchError::NoToolCalls)?;

            let result = registry
                .invoke(&call.function_name, call.arguments.clone())
                .await?;
            conversation.push(Message::tool(&call.function_name, &call.id, result.clone()));

            if options.resubmit {
                let followup = provider.complete(&conversation, &[], None).await?;
                let choice = followup
                    .choices
                    .first()
                    .ok_or(DispatchError::EmptyChoices)?
                    .clone();
                conversation.push(choice.message.clone());
                Ok(DispatchOutcome::Answered {
                    answer: choice.message.content,
                    conversation,
                })
            } else {
                Ok(DispatchOutcome::ToolResult {
                    function_name: call.function_name,
                    arguments: call.arguments,
                    result,
                    conversation,
                })
            }
        }
        other => Err(DispatchError::UnexpectedFinish(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Choice;
    use crate::models::role::Role;
    use crate::providers::mock::{assistant_response, tool_call_response, MockProvider};
    use crate::tools::ToolHandler;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolHandler for CountingTool {
        async fn call(&self, _args: Value) -> Result<String, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("counted".to_string())
        }
    }

    fn counting_registry() -> (ToolRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(
            crate::models::tool::Tool::new("getPaymentStatus", "count calls", json!({})),
            Arc::new(CountingTool {
                calls: calls.clone(),
            }),
        );
        (registry, calls)
    }

    fn seed_conversation() -> Vec<Message> {
        vec![
            Message::system("You are a friendly assistant"),
            Message::user("What's the status of my transaction T1001?"),
        ]
    }

    #[tokio::test]
    async fn test_stop_returns_content_without_invocations() {
        let provider = MockProvider::new(vec![assistant_response("All good!")]);
        let (registry, calls) = counting_registry();

        let outcome = run_dispatch(
            &provider,
            &registry,
            seed_conversation(),
            DispatchOptions::default(),
        )
        .await
        .unwrap();

        match outcome {
            DispatchOutcome::Answered {
                answer,
                conversation,
            } => {
                assert_eq!(answer, "All good!");
                assert_eq!(conversation.len(), 3);
            }
            other => panic!("expected Answered, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tool_call_invokes_once_and_appends_tool_message() {
        let provider = MockProvider::new(vec![tool_call_response(
            "call_1",
            "getPaymentStatus",
            "{\"transactionId\":\"T1001\"}",
        )]);
        let registry = ToolRegistry::with_payment_tools();

        let outcome = run_dispatch(
            &provider,
            &registry,
            seed_conversation(),
            DispatchOptions::default(),
        )
        .await
        .unwrap();

        match outcome {
            DispatchOutcome::ToolResult {
                function_name,
                arguments,
                result,
                conversation,
            } => {
                assert_eq!(function_name, "getPaymentStatus");
                assert_eq!(arguments, json!({"transactionId": "T1001"}));
                assert_eq!(result, json!({"status": "Paid"}).to_string());

                // system, user, assistant tool request, tool result
                assert_eq!(conversation.len(), 4);
                let tool_message = &conversation[3];
                assert_eq!(tool_message.role, Role::Tool);
                assert_eq!(tool_message.name.as_deref(), Some("getPaymentStatus"));
                assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
                assert_eq!(tool_message.content, result);
            }
            other => panic!("expected ToolResult, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resubmit_returns_final_answer() {
        let provider = MockProvider::new(vec![
            tool_call_response("call_1", "getPaymentStatus", "{\"transactionId\":\"T1001\"}"),
            assistant_response("Your transaction T1001 has been paid."),
        ]);
        let registry = ToolRegistry::with_payment_tools();

        let outcome = run_dispatch(
            &provider,
            &registry,
            seed_conversation(),
            DispatchOptions {
                tool_choice: Some(ToolChoice::Any),
                resubmit: true,
            },
        )
        .await
        .unwrap();

        match outcome {
            DispatchOutcome::Answered {
                answer,
                conversation,
            } => {
                assert_eq!(answer, "Your transaction T1001 has been paid.");
                // system, user, tool request, tool result, final answer
                assert_eq!(conversation.len(), 5);
                assert_eq!(conversation[3].role, Role::Tool);
                assert_eq!(conversation[4].role, Role::Assistant);
            }
            other => panic!("expected Answered, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unregistered_function_is_not_invoked() {
        let provider = MockProvider::new(vec![tool_call_response("call_1", "deleteDatabase", "{}")]);
        let (registry, calls) = counting_registry();

        let err = run_dispatch(
            &provider,
            &registry,
            seed_conversation(),
            DispatchOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Tool(ToolError::NotFound(ref name)) if name == "deleteDatabase"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_arguments_fail_before_lookup() {
        // The named function does not exist either; the parse error must win
        // because decoding precedes the registry lookup.
        let provider = MockProvider::new(vec![tool_call_response(
            "call_1",
            "noSuchFunction",
            "{bad json",
        )]);
        let (registry, calls) = counting_registry();

        let err = run_dispatch(
            &provider,
            &registry,
            seed_conversation(),
            DispatchOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Tool(ToolError::InvalidArguments(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unexpected_finish_reason_is_error() {
        let mut response = assistant_response("truncated");
        response.choices[0].finish_reason = FinishReason::Length;
        let provider = MockProvider::new(vec![response]);
        let registry = ToolRegistry::with_payment_tools();

        let err = run_dispatch(
            &provider,
            &registry,
            seed_conversation(),
            DispatchOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::UnexpectedFinish(FinishReason::Length)
        ));
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let response = ChatResponse {
            id: None,
            model: None,
            choices: vec![],
            usage: None,
        };
        let provider = MockProvider::new(vec![response]);
        let registry = ToolRegistry::with_payment_tools();

        let err = run_dispatch(
            &provider,
            &registry,
            seed_conversation(),
            DispatchOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DispatchError::EmptyChoices));
    }

    #[tokio::test]
    async fn test_identical_responses_dispatch_identically() {
        let scripted = || {
            MockProvider::new(vec![tool_call_response(
                "call_1",
                "getPaymentStatus",
                "{\"transactionId\":\"T1001\"}",
            )])
        };
        let registry = ToolRegistry::with_payment_tools();

        let mut shapes = Vec::new();
        for _ in 0..2 {
            let outcome = run_dispatch(
                &scripted(),
                &registry,
                seed_conversation(),
                DispatchOptions::default(),
            )
            .await
            .unwrap();
            if let DispatchOutcome::ToolResult {
                function_name,
                arguments,
                conversation,
                ..
            } = outcome
            {
                shapes.push((function_name, arguments, conversation.len()));
            } else {
                panic!("expected ToolResult");
            }
        }

        assert_eq!(shapes[0], shapes[1]);
    }

    #[test]
    fn test_unpack_returns_none_for_stop() {
        let response = assistant_response("plain answer");
        assert!(unpack_first_call(&response).unwrap().is_none());
    }

    #[test]
    fn test_unpack_only_honors_first_call() {
        let mut response = tool_call_response(
            "call_1",
            "getPaymentStatus",
            "{\"transactionId\":\"T1001\"}",
        );
        response.choices[0]
            .message
            .tool_calls
            .push(crate::models::message::ToolCallRequest::new(
                "call_2",
                "getPaymentDate",
                "{\"transactionId\":\"T1002\"}",
            ));

        let call = unpack_first_call(&response).unwrap().unwrap();
        assert_eq!(call.function_name, "getPaymentStatus");
        assert_eq!(call.id, "call_1");
    }

    #[test]
    fn test_unpack_second_choice_ignored() {
        let mut response = tool_call_response(
            "call_1",
            "getPaymentStatus",
            "{\"transactionId\":\"T1001\"}",
        );
        response.choices.push(Choice {
            index: 1,
            message: Message::assistant("ignored alternative"),
            finish_reason: FinishReason::Stop,
        });

        let call = unpack_first_call(&response).unwrap().unwrap();
        assert_eq!(call.function_name, "getPaymentStatus");
    }
}
