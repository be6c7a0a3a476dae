use std::sync::Arc;

use handbook::providers::base::Provider;
use handbook::retrieval::VectorStore;
use handbook::tools::ToolRegistry;

/// Shared application state. Every route talks to the model, the vector
/// store and the tool registry through these handles, so tests can swap in
/// scripted implementations.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub vector_store: Arc<dyn VectorStore>,
    pub registry: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn Provider>,
        vector_store: Arc<dyn VectorStore>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            vector_store,
            registry,
        }
    }
}
