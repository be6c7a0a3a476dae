use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use handbook::chunking::TextSplitter;

use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

/// Upload cap in bytes.
pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Pull the document text out of a multipart upload.
///
/// A missing `file` field is a 404, anything other than `text/plain` or an
/// oversized upload is a 422. The router's body limit sits above the cap so
/// the size check answers with the envelope instead of a bare 413.
async fn read_upload(mut multipart: Multipart) -> Result<String, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if content_type != "text/plain" {
            return Err(ApiError::Validation(format!(
                "unsupported content type {content_type:?}, only text/plain is accepted"
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::Validation(
                "file exceeds the 2 MB upload limit".to_string(),
            ));
        }

        return String::from_utf8(data.to_vec())
            .map_err(|_| ApiError::Validation("file is not valid UTF-8".to_string()));
    }

    Err(ApiError::NotFound("file field is required".to_string()))
}

fn split_upload(text: &str) -> Vec<String> {
    TextSplitter::default().split(text)
}

async fn chunk_handler(multipart: Multipart) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let text = read_upload(multipart).await?;
    let chunks = split_upload(&text);

    Ok(ApiResponse::success(
        "Document chunked",
        json!({
            "count": chunks.len(),
            "chunks": chunks,
        }),
    ))
}

async fn embed_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let text = read_upload(multipart).await?;
    let chunks = split_upload(&text);
    if chunks.is_empty() {
        return Err(ApiError::Validation(
            "document contains no text".to_string(),
        ));
    }

    let embeddings = state.provider.embed(&chunks).await?;
    let dimensions = embeddings.first().map(|v| v.len()).unwrap_or(0);

    Ok(ApiResponse::success(
        "Document embedded",
        json!({
            "chunks": chunks.len(),
            "dimensions": dimensions,
            "embeddings": embeddings,
        }),
    ))
}

async fn store_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let text = read_upload(multipart).await?;
    let chunks = split_upload(&text);
    if chunks.is_empty() {
        return Err(ApiError::Validation(
            "document contains no text".to_string(),
        ));
    }

    let stored = state.vector_store.add_documents(&chunks).await?;

    Ok(ApiResponse::success(
        "Document stored",
        json!({ "stored": stored }),
    ))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/documents/chunk", post(chunk_handler))
        .route("/api/documents/embed", post(embed_handler))
        .route("/api/documents/store", post(store_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .with_state(state)
}
