//! ReviewLens Server - review analytics API
//!
//! Serves sampled analytics over the reviews collection.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reviewlens_server::{
    config::AppConfig,
    create_router,
    repository::{mongo::MongoStore, Repository, ReviewStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("reviewlens_server={},tower_http=debug", config.logging.level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting ReviewLens Server v{}", env!("CARGO_PKG_VERSION"));

    // The store connects lazily on the first query
    let store: Arc<dyn ReviewStore> = Arc::new(MongoStore::new(
        config.database.clone(),
        config.query.clone(),
    ));

    if config.database.ensure_indexes {
        Repository::new(store.clone()).ensure_indexes().await?;
        tracing::info!("Review indexes ensured");
    }

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState::new(config, store);
    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
