use axum::{
    extract::State,
    http,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::Stream;
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use handbook::errors::ProviderError;
use handbook::models::message::Message;
use handbook::stream::into_byte_stream;

use super::{ChatRequest, ASSISTANT_PROMPT};
use crate::response::ApiError;
use crate::state::AppState;

/// Response type carrying the delta frames as a plain text body. The
/// terminator travels in-band; the client watches the text for it.
pub struct PlainTextStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>,
}

impl PlainTextStream {
    pub(crate) fn new(
        inner: impl Stream<Item = Result<Bytes, ProviderError>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }
}

impl Stream for PlainTextStream {
    type Item = Result<Bytes, ProviderError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl IntoResponse for PlainTextStream {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/plain; charset=utf-8")
            .header("Cache-Control", "no-cache")
            .body(body)
            .unwrap()
    }
}

async fn stream_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<PlainTextStream, ApiError> {
    let input = request.validated()?;

    let messages = vec![Message::system(ASSISTANT_PROMPT), Message::user(input)];
    let events = state.provider.complete_stream(&messages).await?;

    Ok(PlainTextStream::new(into_byte_stream(events)))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/stream", post(stream_handler))
        .with_state(state)
}
