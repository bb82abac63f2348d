//! Review listing endpoints

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

use super::params::{self, WindowParams};

/// Paginated raw review listing
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BotDataResponse {
    /// Reviews matching the window and category
    pub total: u64,
    #[serde(flatten)]
    pub pagination: PageMeta,
    pub message: String,
    /// Reviews, each with `user_review_count`
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<serde_json::Value>,
}

/// Verified reviews of a sample window
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedAnalysisResponse {
    /// Verified reviews in the sample
    pub total: u64,
    #[serde(flatten)]
    pub pagination: PageMeta,
    /// Reviews matching the window and category
    pub total_reviews: u64,
    pub sample_size: u64,
    pub random_offset: u64,
    pub date_range: DateWindow,
    pub weeks_back: u32,
    /// Share of verified reviews in the sample, e.g. "87.5%", or "N/A"
    pub verification_rate: String,
    pub message: String,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<serde_json::Value>,
}

/// Helpful or controversial review ranking
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankedReviewsResponse {
    #[serde(flatten)]
    pub pagination: PageMeta,
    /// Reviews of the sample that clear the vote threshold
    pub total_matching_items: u64,
    pub date_range: DateWindow,
    pub weeks_back: u32,
    pub message: String,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<serde_json::Value>,
}

/// Raw reviews for bot inspection
#[utoipa::path(
    get,
    path = "/api/bot-data",
    tag = "reviews",
    params(WindowParams),
    responses(
        (status = 200, description = "One page of reviews", body = BotDataResponse),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn bot_data(
    State(state): State<crate::AppState>,
    Query(query): Query<WindowParams>,
) -> AppResult<Json<BotDataResponse>> {
    let scope = query.scope(params::BOT_DATA);
    let page = query.page(params::BOT_DATA, state.config.query.max_page_limit);

    let response = state
        .services
        .analytics
        .bot_data(&scope, &page)
        .await
        .map_err(|e| e.at_endpoint("Failed to fetch bot data"))?;

    Ok(Json(response))
}

/// Verified reviews and verification rate of a random sample
#[utoipa::path(
    get,
    path = "/api/verified-analysis",
    tag = "reviews",
    params(WindowParams),
    responses(
        (status = 200, description = "Verified reviews of the sample", body = VerifiedAnalysisResponse),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn verified_analysis(
    State(state): State<crate::AppState>,
    Query(query): Query<WindowParams>,
) -> AppResult<Json<VerifiedAnalysisResponse>> {
    let scope = query.scope(params::VERIFIED);
    let page = query.page(params::VERIFIED, state.config.query.max_page_limit);

    let response = state
        .services
        .analytics
        .verified_analysis(&scope, &page)
        .await
        .map_err(|e| e.at_endpoint("Failed to fetch verified analysis data"))?;

    Ok(Json(response))
}

/// Most helpful reviews of a deterministic sample
#[utoipa::path(
    get,
    path = "/api/helpful-reviews",
    tag = "reviews",
    params(WindowParams),
    responses(
        (status = 200, description = "Ranked reviews", body = RankedReviewsResponse),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn helpful_reviews(
    State(state): State<crate::AppState>,
    Query(query): Query<WindowParams>,
) -> AppResult<Json<RankedReviewsResponse>> {
    let scope = query.scope(params::HELPFUL_REVIEWS);
    let page = query.page(params::HELPFUL_REVIEWS, state.config.query.max_page_limit);

    let response = state
        .services
        .analytics
        .helpful_reviews(&scope, &page)
        .await
        .map_err(|e| e.at_endpoint_with_details("Failed to fetch helpful reviews"))?;

    Ok(Json(response))
}

/// Most controversial reviews of a deterministic sample
#[utoipa::path(
    get,
    path = "/api/controversial-reviews",
    tag = "reviews",
    params(WindowParams),
    responses(
        (status = 200, description = "Ranked reviews", body = RankedReviewsResponse),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn controversial_reviews(
    State(state): State<crate::AppState>,
    Query(query): Query<WindowParams>,
) -> AppResult<Json<RankedReviewsResponse>> {
    let scope = query.scope(params::CONTROVERSIAL_REVIEWS);
    let page = query.page(params::CONTROVERSIAL_REVIEWS, state.config.query.max_page_limit);

    let response = state
        .services
        .analytics
        .controversial_reviews(&scope, &page)
        .await
        .map_err(|e| e.at_endpoint_with_details("Failed to fetch controversial reviews"))?;

    Ok(Json(response))
}
