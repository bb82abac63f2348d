//! Business logic services

pub mod analytics;
pub mod catalog;

use crate::{config::QueryConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub analytics: analytics::AnalyticsService,
    pub catalog: catalog::CatalogService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, query: QueryConfig) -> Self {
        Self {
            analytics: analytics::AnalyticsService::new(repository.clone(), query),
            catalog: catalog::CatalogService::new(repository),
        }
    }
}
