use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

use handbook::dispatch::{run_dispatch, unpack_first_call, DispatchOptions, DispatchOutcome};
use handbook::errors::DispatchError;
use handbook::models::message::Message;
use handbook::providers::base::ToolChoice;

use super::{ChatRequest, ASSISTANT_PROMPT};
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

fn seed_conversation(input: &str) -> Vec<Message> {
    vec![Message::system(ASSISTANT_PROMPT), Message::user(input)]
}

/// Raw model turn with the payment functions advertised. The response is
/// returned as-is so a caller can inspect the requested tool calls.
async fn function_calling_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let input = request.validated()?;

    let response = state
        .provider
        .complete(
            &seed_conversation(input),
            &state.registry.specs(),
            Some(ToolChoice::Any),
        )
        .await?;

    Ok(ApiResponse::success(
        "Model response generated",
        json!(response),
    ))
}

/// Run one model turn and decode the requested call without executing it.
async fn unpack_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let input = request.validated()?;

    let response = state
        .provider
        .complete(
            &seed_conversation(input),
            &state.registry.specs(),
            Some(ToolChoice::Any),
        )
        .await?;

    match unpack_first_call(&response).map_err(ApiError::Dispatch)? {
        Some(call) => Ok(ApiResponse::success(
            "Tool call unpacked",
            json!({
                "functionName": call.function_name,
                "arguments": call.arguments,
            }),
        )),
        None => {
            let choice = response
                .choices
                .first()
                .ok_or(DispatchError::EmptyChoices)?;
            Ok(ApiResponse::success(
                "Model answered directly",
                json!({ "answer": choice.message.content }),
            ))
        }
    }
}

/// Unpack the requested call and execute it, answering with the raw tool
/// result.
async fn dispatch_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let input = request.validated()?;

    let outcome = run_dispatch(
        state.provider.as_ref(),
        &state.registry,
        seed_conversation(input),
        DispatchOptions {
            tool_choice: Some(ToolChoice::Any),
            resubmit: false,
        },
    )
    .await?;

    let (message, data) = match outcome {
        DispatchOutcome::ToolResult {
            function_name,
            arguments,
            result,
            ..
        } => (
            "Tool dispatched",
            json!({
                "functionName": function_name,
                "arguments": arguments,
                "result": result,
            }),
        ),
        DispatchOutcome::Answered { answer, .. } => {
            ("Model answered directly", json!({ "answer": answer }))
        }
    };

    Ok(ApiResponse::success(message, data))
}

/// Full agent turn: dispatch the tool call, then resubmit the extended
/// conversation for a natural-language answer.
async fn agent_complete_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let input = request.validated()?;

    let outcome = run_dispatch(
        state.provider.as_ref(),
        &state.registry,
        seed_conversation(input),
        DispatchOptions {
            tool_choice: Some(ToolChoice::Any),
            resubmit: true,
        },
    )
    .await?;

    let answer = match outcome {
        DispatchOutcome::Answered { answer, .. } => answer,
        DispatchOutcome::ToolResult { result, .. } => result,
    };

    Ok(ApiResponse::success(
        "Agent answer generated",
        json!({ "answer": answer }),
    ))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/tools/function-calling", post(function_calling_handler))
        .route("/api/tools/unpack", post(unpack_handler))
        .route("/api/tools/dispatch", post(dispatch_handler))
        .route("/api/agent/complete", post(agent_complete_handler))
        .with_state(state)
}
