//! Sampled statistics endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    query::{DateWindow, PageMeta},
};

use super::params::{self, WeeksBackParams, WindowParams};

/// Reviewer behaviour counts over a sample window
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BotStatsResponse {
    /// Reviewers with exactly one review in the sample
    pub one_and_done: u64,
    /// Reviewers with five or more reviews in the sample
    pub rapid_fire: u64,
    pub total_reviews: u64,
    pub sample_size: u64,
    pub random_offset: u64,
    pub date_range: DateWindow,
    pub weeks_back: u32,
    pub message: String,
}

/// Products ranked by review count in a sample window
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrendingProductsResponse {
    /// `totalPages` is never set; `hasMore` means a full page came back
    #[serde(flatten)]
    pub pagination: PageMeta,
    pub total_reviews: u64,
    pub sample_size: u64,
    pub random_offset: u64,
    pub date_range: DateWindow,
    pub weeks_back: u32,
    pub message: String,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<serde_json::Value>,
}

/// Verified vs unverified comparison
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedStatsResponse {
    /// `{verified, count, avgRating, avgHelpful}` per flag value
    #[schema(value_type = Vec<Object>)]
    pub comparison_stats: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub pagination: PageMeta,
    pub total_reviews: u64,
    pub sample_size: u64,
    pub random_offset: u64,
    pub date_range: DateWindow,
    pub weeks_back: u32,
    pub message: String,
}

/// One-and-done and rapid-fire reviewer counts
#[utoipa::path(
    get,
    path = "/api/bot-stats",
    tag = "stats",
    params(WeeksBackParams),
    responses(
        (status = 200, description = "Reviewer counts", body = BotStatsResponse),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn bot_stats(
    State(state): State<crate::AppState>,
    Query(query): Query<WeeksBackParams>,
) -> AppResult<Json<BotStatsResponse>> {
    let scope = query.scope(params::BOT_STATS_WEEKS_BACK);

    let response = state
        .services
        .analytics
        .bot_stats(&scope)
        .await
        .map_err(|e| e.at_endpoint("Failed to compute bot stats"))?;

    Ok(Json(response))
}

/// Trending products
#[utoipa::path(
    get,
    path = "/api/trending-products",
    tag = "stats",
    params(WindowParams),
    responses(
        (status = 200, description = "Ranked products", body = TrendingProductsResponse),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn trending_products(
    State(state): State<crate::AppState>,
    Query(query): Query<WindowParams>,
) -> AppResult<Json<TrendingProductsResponse>> {
    let scope = query.scope(params::TRENDING_PRODUCTS);
    let page = query.page(params::TRENDING_PRODUCTS, state.config.query.max_page_limit);

    let response = state
        .services
        .analytics
        .trending_products(&scope, &page)
        .await
        .map_err(|e| e.at_endpoint("Failed to fetch trending products"))?;

    Ok(Json(response))
}

/// Verified vs unverified averages
#[utoipa::path(
    get,
    path = "/api/verified-stats",
    tag = "stats",
    params(WindowParams),
    responses(
        (status = 200, description = "Comparison rows", body = VerifiedStatsResponse),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn verified_stats(
    State(state): State<crate::AppState>,
    Query(query): Query<WindowParams>,
) -> AppResult<Json<VerifiedStatsResponse>> {
    let scope = query.scope(params::VERIFIED);
    let page = query.page(params::VERIFIED, state.config.query.max_page_limit);

    let response = state
        .services
        .analytics
        .verified_stats(&scope, &page)
        .await
        .map_err(|e| e.at_endpoint("Failed to fetch verified comparison stats"))?;

    Ok(Json(response))
}
