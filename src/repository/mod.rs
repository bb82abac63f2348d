//! Repository layer for document store operations

pub mod indexes;
pub mod memory;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::{
    error::AppResult,
    query::{try_or_else, Filter, KeySpec, Pipeline, SortOrder},
};

/// Read-only primitives the query layer needs from the review store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Name of the review collection, used by correlated lookups
    fn collection_name(&self) -> &str;

    /// Exact count of documents matching `filter`
    async fn count_documents(&self, filter: &Filter) -> AppResult<u64>;

    /// Collection size from metadata, without scanning
    async fn estimated_document_count(&self) -> AppResult<u64>;

    async fn aggregate(&self, pipeline: &Pipeline) -> AppResult<Vec<Document>>;

    async fn distinct(&self, field: &str) -> AppResult<Vec<Bson>>;

    /// Up to `limit` `review_date` values shaped like `YYYY-MM-DD`, in `order`
    async fn review_dates(&self, order: SortOrder, limit: i64) -> AppResult<Vec<String>>;

    async fn create_index(&self, keys: &KeySpec) -> AppResult<()>;

    async fn ping(&self) -> AppResult<()>;
}

/// Main repository struct holding the store handle
#[derive(Clone)]
pub struct Repository {
    pub reviews: Arc<dyn ReviewStore>,
}

impl Repository {
    /// Create a new repository over the given store
    pub fn new(reviews: Arc<dyn ReviewStore>) -> Self {
        Self { reviews }
    }

    /// Total for a listing: metadata count when unfiltered, otherwise an exact
    /// count that degrades to the metadata count if it fails.
    pub async fn count_matching(&self, filter: &Filter) -> AppResult<u64> {
        if filter.is_empty() {
            return self.reviews.estimated_document_count().await;
        }
        try_or_else(self.reviews.count_documents(filter), |err| async move {
            tracing::warn!("Exact count failed, using estimated count: {}", err);
            self.reviews.estimated_document_count().await
        })
        .await
    }

    /// Create every review index, stopping at the first hard failure
    pub async fn ensure_indexes(&self) -> AppResult<()> {
        for keys in indexes::review_indexes() {
            self.reviews.create_index(&keys).await?;
            tracing::info!("Index ready: {}", keys.name());
        }
        Ok(())
    }
}
