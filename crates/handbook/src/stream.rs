//! Bridges a provider event stream into a byte stream an HTTP response
//! body can be built from.
//!
//! The wire contract is plain text: UTF-8 delta frames in arrival order,
//! terminated by the literal `END_STREAM`. The terminator is an in-band
//! marker the receiving client watches for; it is not an HTTP-level close.

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::errors::ProviderError;
use crate::providers::base::EventStream;

/// Reserved literal appended after the last delta. A client must stop
/// displaying output once this substring arrives. If the model ever emits
/// the same literal as real content the client cannot tell the difference;
/// the wire format is kept for compatibility with existing consumers.
pub const STREAM_TERMINATOR: &str = "END_STREAM";

/// Encode one text delta as a transport frame. UTF-8 so that multi-byte
/// characters split across frames stay decodable by a streaming decoder.
pub fn encode_delta(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}

/// Re-expose a provider event stream as a pull-based byte stream.
///
/// Events with no delta content produce no frame but do not terminate the
/// stream. When the underlying sequence is exhausted exactly one terminator
/// frame is emitted. An error from the underlying sequence propagates as a
/// stream error and suppresses the terminator, so a consumer never mistakes
/// a failed stream for a completed one.
///
/// Single consumer: one adapter per request. Dropping the stream early
/// (client disconnect) drops the provider stream with it, so no further
/// events are pulled.
pub fn into_byte_stream(
    mut events: EventStream,
) -> impl Stream<Item = Result<Bytes, ProviderError>> + Send {
    async_stream::try_stream! {
        while let Some(event) = events.next().await {
            let event = event?;
            if let Some(content) = event.delta_content() {
                if !content.is_empty() {
                    yield encode_delta(content);
                }
            }
        }
        yield encode_delta(STREAM_TERMINATOR);
    }
}
