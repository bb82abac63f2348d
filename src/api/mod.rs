//! API handlers for ReviewLens REST endpoints

pub mod catalog;
pub mod health;
pub mod openapi;
pub mod params;
pub mod reviews;
pub mod stats;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // The dashboard is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        .route("/", get(health::root))
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Reviews
        .route("/api/bot-data", get(reviews::bot_data))
        .route("/api/verified-analysis", get(reviews::verified_analysis))
        .route("/api/helpful-reviews", get(reviews::helpful_reviews))
        .route("/api/controversial-reviews", get(reviews::controversial_reviews))
        // Stats
        .route("/api/bot-stats", get(stats::bot_stats))
        .route("/api/trending-products", get(stats::trending_products))
        .route("/api/verified-stats", get(stats::verified_stats))
        // Catalog
        .route("/api/categories", get(catalog::categories))
        .route("/api/overview-meta", get(catalog::overview_meta))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
