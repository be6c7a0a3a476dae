use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::chat::FinishReason;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Failures talking to the model or embedding endpoints.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Failures in the tool dispatch cycle. None of these are retried; they
/// propagate to the request boundary where they are mapped to an error
/// envelope.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("model response contained no choices")]
    EmptyChoices,

    #[error("finish reason was tool_calls but no tool calls were present")]
    NoToolCalls,

    #[error("unhandled finish reason: {0:?}")]
    UnexpectedFinish(FinishReason),
}

/// Failures from the vector store or while embedding a query for it.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("vector store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("vector store returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("embedding response was empty")]
    EmptyEmbedding,
}
