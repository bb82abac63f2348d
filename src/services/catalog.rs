//! Dataset catalog service: categories and overview metadata

use crate::{
    api::catalog::OverviewMetaResponse,
    error::AppResult,
    models::review::PRODUCT_CATEGORY,
    query::{category::clean_categories, date_window::is_iso_date, SortOrder},
    repository::Repository,
};

/// How many dated reviews each end of the overview looks at
const DATE_PROBE: i64 = 10;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Cleaned, sorted categories behind the "All" sentinel
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let values = self.repository.reviews.distinct(PRODUCT_CATEGORY).await?;
        Ok(clean_categories(values))
    }

    /// Collection size, review date span and categories, fetched concurrently
    pub async fn overview_meta(&self) -> AppResult<OverviewMetaResponse> {
        let reviews = &self.repository.reviews;
        let (size, earliest, latest, categories) = tokio::try_join!(
            reviews.estimated_document_count(),
            reviews.review_dates(SortOrder::Ascending, DATE_PROBE),
            reviews.review_dates(SortOrder::Descending, DATE_PROBE),
            reviews.distinct(PRODUCT_CATEGORY),
        )?;

        Ok(OverviewMetaResponse {
            size,
            earliest_date: earliest.into_iter().filter(|d| is_iso_date(d)).min(),
            latest_date: latest.into_iter().filter(|d| is_iso_date(d)).max(),
            categories: clean_categories(categories),
        })
    }

    /// Round trip to the store
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.reviews.ping().await
    }
}
