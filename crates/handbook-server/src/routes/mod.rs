// Export route modules
pub mod chat;
pub mod documents;
pub mod stream;
pub mod tools;

use axum::Router;
use serde::Deserialize;

use crate::response::ApiError;
use crate::state::AppState;

pub(crate) const CHEESE_PROMPT: &str =
    "You are a friendly cheese connoisseur. When asked about cheese, reply concisely and humorously.";
pub(crate) const ASSISTANT_PROMPT: &str = "You are a friendly assistant.";
pub(crate) const HANDBOOK_PROMPT: &str =
    "You are a helpful assistant that answers questions about the employee handbook.";

/// The JSON body shared by the text-in routes.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    #[serde(rename = "inputText")]
    pub input_text: String,
}

impl ChatRequest {
    /// Trimmed input text. Empty or whitespace-only input is rejected.
    pub fn validated(&self) -> Result<&str, ApiError> {
        let text = self.input_text.trim();
        if text.is_empty() {
            return Err(ApiError::Validation(
                "inputText must not be empty".to_string(),
            ));
        }
        Ok(text)
    }
}

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(stream::routes(state.clone()))
        .merge(tools::routes(state.clone()))
        .merge(documents::routes(state))
}
