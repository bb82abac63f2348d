//! ReviewLens analytics server
//!
//! Read-only REST JSON API computing sampled, paginated analytics (bot
//! heuristics, trending products, verified-purchase impact, helpful and
//! controversial reviews) over a large product-review collection.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod repository;
pub mod services;

pub use api::create_router;
pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire services over the given store
    pub fn new(config: AppConfig, store: Arc<dyn repository::ReviewStore>) -> Self {
        let repository = repository::Repository::new(store);
        let services = services::Services::new(repository, config.query.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
