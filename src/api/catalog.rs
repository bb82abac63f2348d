//! Catalog endpoints: categories and dataset overview

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    query::category::ALL_CATEGORIES,
};

#[derive(Serialize, ToSchema)]
pub struct CategoriesResponse {
    /// "All" followed by the cleaned categories, sorted
    pub categories: Vec<String>,
}

/// Failure body that still lets the client render its selector
#[derive(Serialize, ToSchema)]
pub struct CategoriesFailure {
    pub categories: Vec<String>,
    pub error: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverviewMetaResponse {
    /// Estimated number of reviews
    pub size: u64,
    /// Earliest well-formed review date, if any
    pub earliest_date: Option<String>,
    /// Latest well-formed review date, if any
    pub latest_date: Option<String>,
    pub categories: Vec<String>,
}

/// Distinct product categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "catalog",
    responses(
        (status = 200, description = "Categories", body = CategoriesResponse),
        (status = 500, description = "Store failure", body = CategoriesFailure)
    )
)]
pub async fn categories(State(state): State<crate::AppState>) -> Response {
    match state.services.catalog.categories().await {
        Ok(categories) => Json(CategoriesResponse { categories }).into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch categories: {}", e);
            let body = CategoriesFailure {
                categories: vec![ALL_CATEGORIES.to_string()],
                error: "Failed to fetch categories".to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Dataset size, date span and categories
#[utoipa::path(
    get,
    path = "/api/overview-meta",
    tag = "catalog",
    responses(
        (status = 200, description = "Overview", body = OverviewMetaResponse),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn overview_meta(
    State(state): State<crate::AppState>,
) -> AppResult<Json<OverviewMetaResponse>> {
    let response = state
        .services
        .catalog
        .overview_meta()
        .await
        .map_err(|e| e.at_endpoint("Failed to fetch overview meta"))?;

    Ok(Json(response))
}
