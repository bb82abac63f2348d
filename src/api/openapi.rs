//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{catalog, health, params, reviews, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ReviewLens API",
        version = "1.0.0",
        description = "Sampled review analytics over a large product-review dataset"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Reviews
        reviews::bot_data,
        reviews::verified_analysis,
        reviews::helpful_reviews,
        reviews::controversial_reviews,
        // Stats
        stats::bot_stats,
        stats::trending_products,
        stats::verified_stats,
        // Catalog
        catalog::categories,
        catalog::overview_meta,
    ),
    components(
        schemas(
            params::WindowParams,
            params::WeeksBackParams,
            crate::query::PageMeta,
            crate::query::DateWindow,
            crate::models::review::Review,
            // Reviews
            reviews::BotDataResponse,
            reviews::VerifiedAnalysisResponse,
            reviews::RankedReviewsResponse,
            // Stats
            stats::BotStatsResponse,
            stats::TrendingProductsResponse,
            stats::VerifiedStatsResponse,
            // Catalog
            catalog::CategoriesResponse,
            catalog::CategoriesFailure,
            catalog::OverviewMetaResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "reviews", description = "Review listings and rankings"),
        (name = "stats", description = "Sampled statistics"),
        (name = "catalog", description = "Categories and dataset overview")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
