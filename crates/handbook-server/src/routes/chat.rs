use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

use handbook::errors::DispatchError;
use handbook::models::message::Message;
use handbook::retrieval::build_context;
use handbook::stream::into_byte_stream;

use super::stream::PlainTextStream;
use super::{ChatRequest, CHEESE_PROMPT, HANDBOOK_PROMPT};
use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

/// How many stored chunks ground a handbook answer.
const RAG_MATCH_COUNT: usize = 3;

async fn completion_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let input = request.validated()?;

    let messages = vec![Message::system(CHEESE_PROMPT), Message::user(input)];
    let response = state.provider.complete(&messages, &[], None).await?;
    let answer = response
        .choices
        .first()
        .ok_or(DispatchError::EmptyChoices)?
        .message
        .content
        .clone();

    Ok(ApiResponse::success(
        "Chat completion generated",
        json!({
            "answer": answer,
            "response": response,
        }),
    ))
}

/// Grounded answer, streamed with the same wire contract as
/// `/api/chat/stream`: retrieval happens up front, then the augmented
/// conversation streams back as delta frames plus the terminator.
async fn rag_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<PlainTextStream, ApiError> {
    let input = request.validated()?;

    let matches = state
        .vector_store
        .similarity_search(input, RAG_MATCH_COUNT)
        .await?;
    let context = build_context(&matches);

    let messages = vec![
        Message::system(HANDBOOK_PROMPT),
        Message::user(format!(
            "Handbook context: {context} - Question: {input}"
        )),
    ];
    let events = state.provider.complete_stream(&messages).await?;

    Ok(PlainTextStream::new(into_byte_stream(events)))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/completion", post(completion_handler))
        .route("/api/chat/rag", post(rag_handler))
        .with_state(state)
}
