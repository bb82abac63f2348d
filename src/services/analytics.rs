//! Review analytics service

use std::time::Instant;

use mongodb::bson::Document;

use crate::{
    api::{
        reviews::{BotDataResponse, RankedReviewsResponse, VerifiedAnalysisResponse},
        stats::{BotStatsResponse, TrendingProductsResponse, VerifiedStatsResponse},
    },
    config::QueryConfig,
    error::AppResult,
    models::review::{ID, VERIFIED},
    query::{
        builder::{self, review_filter, Ranking, COUNT_FIELD},
        response::{count_field, group_thousands, to_json_rows},
        sampling, Completeness, DateSelector, DateWindow, DateWindowResolver, Filter, PageMeta,
        PageRequest, SampleWindow, SamplingMode,
    },
    repository::Repository,
};

/// What part of the dataset a request is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeScope {
    pub selector: DateSelector,
    /// Weeks-back value in effect, echoed in responses
    pub weeks_back: u32,
    /// Used when the selector cannot be resolved
    pub default_weeks: u32,
    pub category: Option<String>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    repository: Repository,
    query: QueryConfig,
    resolver: DateWindowResolver,
}

impl AnalyticsService {
    pub fn new(repository: Repository, query: QueryConfig) -> Self {
        let resolver = DateWindowResolver::new(query.dataset_max_date);
        Self {
            repository,
            query,
            resolver,
        }
    }

    fn window(&self, scope: &TimeScope) -> DateWindow {
        self.resolver.resolve(&scope.selector, scope.default_weeks)
    }

    fn filter(&self, scope: &TimeScope, window: &DateWindow) -> Filter {
        review_filter(&window.start_date, &window.end_date, scope.category.as_deref())
    }

    /// Count the matching reviews, then place a sample window over them
    async fn sample(
        &self,
        filter: &Filter,
        size: u64,
        mode: &SamplingMode,
    ) -> AppResult<(u64, SampleWindow)> {
        let total = self.repository.count_matching(filter).await?;
        Ok((total, sampling::plan(total, size, mode)))
    }

    /// Raw reviews of the window, newest first, with each author's review count
    pub async fn bot_data(
        &self,
        scope: &TimeScope,
        page: &PageRequest,
    ) -> AppResult<BotDataResponse> {
        let window = self.window(scope);
        let filter = self.filter(scope, &window);
        let pipeline = builder::bot_listing(
            &filter,
            scope.category.is_some(),
            page,
            self.repository.reviews.collection_name(),
        );

        let (rows, total) = tokio::try_join!(
            self.repository.reviews.aggregate(&pipeline),
            self.repository.count_matching(&filter),
        )?;

        let pagination = PageMeta::new(page, Some(total), rows.len(), Completeness::Exact);
        let message = format!(
            "Showing page {} of {} ({} reviews)",
            page.page,
            pagination.total_pages.unwrap_or(0),
            rows.len()
        );
        Ok(BotDataResponse {
            total,
            pagination,
            message,
            data: to_json_rows(rows),
        })
    }

    /// One-and-done and rapid-fire reviewer counts over a random sample
    pub async fn bot_stats(&self, scope: &TimeScope) -> AppResult<BotStatsResponse> {
        let started = Instant::now();
        let window = self.window(scope);
        let filter = review_filter(&window.start_date, &window.end_date, None);
        let (total_reviews, sample) = self
            .sample(&filter, self.query.sample_size, &SamplingMode::PseudoRandom)
            .await?;

        let rows = self
            .repository
            .reviews
            .aggregate(&builder::bot_stats(&filter, sample))
            .await?;
        let facets = rows.first();
        let facet_total = |name: &str| {
            let first = facets
                .and_then(|doc| doc.get_array(name).ok())
                .and_then(|rows| rows.first())
                .and_then(|row| row.as_document());
            count_field(first, COUNT_FIELD)
        };

        let elapsed = started.elapsed().as_millis();
        tracing::debug!(
            "bot-stats: {} reviews, offset {}, {}ms",
            total_reviews,
            sample.offset,
            elapsed
        );
        Ok(BotStatsResponse {
            one_and_done: facet_total("oneAndDone"),
            rapid_fire: facet_total("rapidFire"),
            total_reviews,
            sample_size: sample.size,
            random_offset: sample.offset,
            date_range: window,
            weeks_back: scope.weeks_back,
            message: format!(
                "Bot detection from {} sample at offset {} ({} total reviews, {}ms)",
                group_thousands(sample.size),
                group_thousands(sample.offset),
                group_thousands(total_reviews),
                elapsed
            ),
        })
    }

    /// Most reviewed products of a random sample
    pub async fn trending_products(
        &self,
        scope: &TimeScope,
        page: &PageRequest,
    ) -> AppResult<TrendingProductsResponse> {
        let started = Instant::now();
        let window = self.window(scope);
        let filter = self.filter(scope, &window);
        let (total_reviews, sample) = self
            .sample(&filter, self.query.sample_size, &SamplingMode::PseudoRandom)
            .await?;

        let rows = self
            .repository
            .reviews
            .aggregate(&builder::trending_products(&filter, sample, page))
            .await?;

        // The number of distinct products in the sample is never computed
        let pagination = PageMeta::new(page, None, rows.len(), Completeness::Sampled);
        let elapsed = started.elapsed().as_millis();
        tracing::debug!(
            "trending-products: {} reviews, offset {}, {}ms",
            total_reviews,
            sample.offset,
            elapsed
        );
        Ok(TrendingProductsResponse {
            message: format!(
                "Page {}: {} trending products from {} sample at offset {} ({} total reviews, {}ms)",
                page.page,
                rows.len(),
                group_thousands(sample.size),
                group_thousands(sample.offset),
                group_thousands(total_reviews),
                elapsed
            ),
            pagination,
            total_reviews,
            sample_size: sample.size,
            random_offset: sample.offset,
            date_range: window,
            weeks_back: scope.weeks_back,
            data: to_json_rows(rows),
        })
    }

    /// Verified reviews of a random sample and the sample's verification rate
    pub async fn verified_analysis(
        &self,
        scope: &TimeScope,
        page: &PageRequest,
    ) -> AppResult<VerifiedAnalysisResponse> {
        let started = Instant::now();
        let window = self.window(scope);
        let filter = self.filter(scope, &window);
        let (total_reviews, sample) = self
            .sample(&filter, self.query.sample_size, &SamplingMode::PseudoRandom)
            .await?;

        let listing = builder::verified_listing(&filter, sample, page);
        let counts = builder::verification_counts(&filter, sample);
        let (rows, groups) = tokio::try_join!(
            self.repository.reviews.aggregate(&listing),
            self.repository.reviews.aggregate(&counts),
        )?;

        let verified = group_count(&groups, VERIFIED);
        let unverified = group_count(&groups, "N");
        let pagination = PageMeta::new(page, Some(verified), rows.len(), Completeness::Sampled);
        let elapsed = started.elapsed().as_millis();
        tracing::debug!(
            "verified-analysis: {} reviews, offset {}, {}ms",
            total_reviews,
            sample.offset,
            elapsed
        );
        Ok(VerifiedAnalysisResponse {
            total: verified,
            message: format!(
                "{} verified reviews from {} sample at offset {} ({} total, {}ms)",
                rows.len(),
                group_thousands(sample.size),
                group_thousands(sample.offset),
                group_thousands(total_reviews),
                elapsed
            ),
            pagination,
            total_reviews,
            sample_size: sample.size,
            random_offset: sample.offset,
            date_range: window,
            weeks_back: scope.weeks_back,
            verification_rate: verification_rate(verified, unverified),
            data: to_json_rows(rows),
        })
    }

    /// Verified vs unverified averages over a larger random sample
    pub async fn verified_stats(
        &self,
        scope: &TimeScope,
        page: &PageRequest,
    ) -> AppResult<VerifiedStatsResponse> {
        let started = Instant::now();
        let window = self.window(scope);
        let filter = self.filter(scope, &window);
        let (total_reviews, sample) = self
            .sample(&filter, self.query.stats_sample_size, &SamplingMode::PseudoRandom)
            .await?;

        let rows = self
            .repository
            .reviews
            .aggregate(&builder::verified_comparison(&filter, sample, page))
            .await?;

        let grouped: u64 = rows.iter().map(|row| count_field(Some(row), "count")).sum();
        let pagination = PageMeta::new(page, Some(grouped), rows.len(), Completeness::Sampled);
        let elapsed = started.elapsed().as_millis();
        tracing::debug!(
            "verified-stats: {} reviews, offset {}, {}ms",
            total_reviews,
            sample.offset,
            elapsed
        );
        Ok(VerifiedStatsResponse {
            comparison_stats: to_json_rows(rows),
            pagination,
            total_reviews,
            sample_size: sample.size,
            random_offset: sample.offset,
            date_range: window,
            weeks_back: scope.weeks_back,
            message: format!(
                "Verified vs unverified from {} sample at offset {} ({} total, {}ms)",
                group_thousands(sample.size),
                group_thousands(sample.offset),
                group_thousands(total_reviews),
                elapsed
            ),
        })
    }

    pub async fn helpful_reviews(
        &self,
        scope: &TimeScope,
        page: &PageRequest,
    ) -> AppResult<RankedReviewsResponse> {
        self.ranked_reviews(Ranking::Helpful, scope, page).await
    }

    pub async fn controversial_reviews(
        &self,
        scope: &TimeScope,
        page: &PageRequest,
    ) -> AppResult<RankedReviewsResponse> {
        self.ranked_reviews(Ranking::Controversial, scope, page).await
    }

    /// Rank a deterministic sample, so every page of the same query reads the
    /// same window
    async fn ranked_reviews(
        &self,
        ranking: Ranking,
        scope: &TimeScope,
        page: &PageRequest,
    ) -> AppResult<RankedReviewsResponse> {
        let started = Instant::now();
        let window = self.window(scope);
        let filter = self.filter(scope, &window);
        let mode = SamplingMode::keyed(
            &window.start_date,
            &window.end_date,
            scope.category.as_deref(),
        );
        let (total_reviews, sample) = self.sample(&filter, self.query.sample_size, &mode).await?;

        let count = ranking.count_pipeline(&filter, sample);
        let ranked = ranking.pipeline(&filter, sample, page);
        let (counted, rows) = tokio::try_join!(
            self.repository.reviews.aggregate(&count),
            self.repository.reviews.aggregate(&ranked),
        )?;

        let total_matching_items = count_field(counted.first(), COUNT_FIELD);
        let pagination = PageMeta::new(
            page,
            Some(total_matching_items),
            rows.len(),
            Completeness::Sampled,
        );
        let elapsed = started.elapsed().as_millis();
        tracing::debug!(
            "{:?} reviews: {} reviews, offset {}, {}ms",
            ranking,
            total_reviews,
            sample.offset,
            elapsed
        );
        let label = match ranking {
            Ranking::Helpful => "most helpful",
            Ranking::Controversial => "controversial",
        };
        Ok(RankedReviewsResponse {
            message: format!(
                "{} {} reviews from {} sample ({} total matching, {}ms)",
                rows.len(),
                label,
                group_thousands(sample.size),
                group_thousands(total_matching_items),
                elapsed
            ),
            pagination,
            total_matching_items,
            date_range: window,
            weeks_back: scope.weeks_back,
            data: to_json_rows(rows),
        })
    }
}

/// `count` of the group whose `_id` is `flag`, 0 when absent
fn group_count(groups: &[Document], flag: &str) -> u64 {
    let group = groups
        .iter()
        .find(|group| group.get_str(ID).map(|id| id == flag).unwrap_or(false));
    count_field(group, "count")
}

fn verification_rate(verified: u64, unverified: u64) -> String {
    let total = verified + unverified;
    if total == 0 {
        return "N/A".to_string();
    }
    format!("{:.1}%", verified as f64 / total as f64 * 100.0)
}
