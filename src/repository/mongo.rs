//! MongoDB-backed review store.
//!
//! The client is created on first use and kept for the lifetime of the
//! process. It is never torn down explicitly.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::ErrorKind,
    options::{AggregateOptions, CountOptions, FindOptions, Hint},
    Client, Collection, Database, IndexModel,
};
use tokio::sync::OnceCell;

use crate::{
    config::{DatabaseConfig, QueryConfig},
    error::{AppError, AppResult},
    models::review::REVIEW_DATE,
    query::{Filter, KeySpec, Pipeline, SortOrder},
};

use super::ReviewStore;

/// Server error codes meaning an equivalent index is already there
const INDEX_OPTIONS_CONFLICT: i32 = 85;
const INDEX_KEY_SPECS_CONFLICT: i32 = 86;

pub struct MongoStore {
    database: DatabaseConfig,
    query: QueryConfig,
    handle: OnceCell<Database>,
}

impl MongoStore {
    /// Create the store without connecting
    pub fn new(database: DatabaseConfig, query: QueryConfig) -> Self {
        Self {
            database,
            query,
            handle: OnceCell::new(),
        }
    }

    async fn database(&self) -> AppResult<&Database> {
        self.handle
            .get_or_try_init(|| async {
                let client = Client::with_uri_str(&self.database.url).await?;
                tracing::info!("Connected to MongoDB database {}", self.database.name);
                Ok::<_, AppError>(client.database(&self.database.name))
            })
            .await
    }

    async fn collection(&self) -> AppResult<Collection<Document>> {
        Ok(self
            .database()
            .await?
            .collection::<Document>(&self.database.collection))
    }

    fn aggregate_options(&self, pipeline: &Pipeline) -> AggregateOptions {
        let mut options = AggregateOptions::default();
        options.max_time = Some(self.query.max_time());
        options.allow_disk_use = Some(self.query.allow_disk_use);
        options.hint = pipeline.hint().map(|keys| Hint::Keys(keys.to_document()));
        options
    }
}

#[async_trait]
impl ReviewStore for MongoStore {
    fn collection_name(&self) -> &str {
        &self.database.collection
    }

    async fn count_documents(&self, filter: &Filter) -> AppResult<u64> {
        let mut options = CountOptions::default();
        options.max_time = Some(self.query.max_time());
        let count = self
            .collection()
            .await?
            .count_documents(filter.to_document())
            .with_options(options)
            .await?;
        Ok(count)
    }

    async fn estimated_document_count(&self) -> AppResult<u64> {
        Ok(self.collection().await?.estimated_document_count().await?)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> AppResult<Vec<Document>> {
        let cursor = self
            .collection()
            .await?
            .aggregate(pipeline.to_documents())
            .with_options(self.aggregate_options(pipeline))
            .await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }

    async fn distinct(&self, field: &str) -> AppResult<Vec<Bson>> {
        Ok(self.collection().await?.distinct(field, doc! {}).await?)
    }

    async fn review_dates(&self, order: SortOrder, limit: i64) -> AppResult<Vec<String>> {
        let mut options = FindOptions::default();
        options.sort = Some(KeySpec(vec![(REVIEW_DATE, order)]).to_document());
        options.limit = Some(limit);
        options.projection = Some(doc! { REVIEW_DATE: 1, "_id": 0 });

        let cursor = self
            .collection()
            .await?
            .find(doc! { REVIEW_DATE: { "$regex": r"^\d{4}-\d{2}-\d{2}$" } })
            .with_options(options)
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents
            .iter()
            .filter_map(|doc| doc.get_str(REVIEW_DATE).ok().map(str::to_string))
            .collect())
    }

    async fn create_index(&self, keys: &KeySpec) -> AppResult<()> {
        let model = IndexModel::builder().keys(keys.to_document()).build();
        match self.collection().await?.create_index(model).await {
            Ok(_) => Ok(()),
            Err(err) => {
                let already_exists = matches!(
                    *err.kind,
                    ErrorKind::Command(ref command)
                        if matches!(command.code, INDEX_OPTIONS_CONFLICT | INDEX_KEY_SPECS_CONFLICT)
                );
                if already_exists {
                    tracing::warn!("Index {} already exists", keys.name());
                    Ok(())
                } else {
                    Err(err.into())
                }
            }
        }
    }

    async fn ping(&self) -> AppResult<()> {
        self.database().await?.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
