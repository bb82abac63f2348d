//! In-process router harness backed by the memory store

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mongodb::bson::Document;
use reviewlens_server::{
    config::AppConfig, create_router, models::review::Review, repository::memory::MemoryStore,
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

/// Router over a memory store seeded with `reviews`
pub fn app(reviews: Vec<Document>) -> Router {
    let store = Arc::new(MemoryStore::new(reviews));
    create_router(AppState::new(AppConfig::default(), store))
}

/// Router whose store fails every call
pub fn unreachable_app() -> Router {
    let store = Arc::new(MemoryStore::unreachable());
    create_router(AppState::new(AppConfig::default(), store))
}

/// GET `uri` and decode the JSON body
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// A verified five-star Electronics review dated on the dataset's last day
pub fn review(id: &str) -> Review {
    Review {
        review_id: id.to_string(),
        customer_id: format!("C-{}", id),
        product_id: "P-1".to_string(),
        product_title: "Noise Cancelling Headphones".to_string(),
        product_category: "Electronics".to_string(),
        star_rating: "5".to_string(),
        review_date: Some("2015-08-31".to_string()),
        verified_purchase: "Y".to_string(),
        helpful_votes: "0".to_string(),
        total_votes: "0".to_string(),
        review_headline: "Five Stars".to_string(),
        review_body: "Works as described".to_string(),
    }
}

pub fn documents(reviews: Vec<Review>) -> Vec<Document> {
    reviews.iter().map(Review::to_document).collect()
}

/// `review_id` of every row in `data`
pub fn ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row["review_id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
