//! ILL eligibility server
//!
//! REST front for the inter-library loan eligibility engine.

use std::net::SocketAddr;
use std::sync::Arc;

use ill_eligibility::{
    api,
    config::AppConfig,
    logging,
    services::{search::SolrSearchClient, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    logging::init(&config.logging);

    tracing::info!("Starting ILL eligibility server v{}", env!("CARGO_PKG_VERSION"));

    // Search index client
    let search = SolrSearchClient::new(&config.search)?;
    tracing::info!(
        "Using search index {} (profile {}, timeout {} ms)",
        config.search.base_url,
        config.search.profile,
        config.search.timeout_ms
    );

    let services = Services::new(&config, Arc::new(search))?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
