mod configuration;
mod error;
mod response;
mod routes;
mod state;

use std::sync::Arc;

use handbook::providers::base::Provider;
use handbook::providers::mistral::MistralProvider;
use handbook::retrieval::SupabaseVectorStore;
use handbook::tools::ToolRegistry;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::configuration::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let settings = Settings::new()?;
    let addr = settings.server.socket_addr();

    let provider: Arc<dyn Provider> =
        Arc::new(MistralProvider::new(settings.provider.into_config())?);
    let vector_store = Arc::new(SupabaseVectorStore::new(
        settings.vector_store.into_config(),
        provider.clone(),
    )?);
    let registry = Arc::new(ToolRegistry::with_payment_tools());

    let state = AppState::new(provider, vector_store, registry);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
