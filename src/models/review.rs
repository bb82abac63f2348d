//! Review document model.
//!
//! Reviews are ingested elsewhere and only ever read here. Numeric fields are
//! stored as strings and `review_date` may be missing or malformed, so the
//! query layer never trusts the raw representation.

use mongodb::bson::{self, Bson, Document};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const ID: &str = "_id";
pub const REVIEW_ID: &str = "review_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const PRODUCT_ID: &str = "product_id";
pub const PRODUCT_TITLE: &str = "product_title";
pub const PRODUCT_CATEGORY: &str = "product_category";
pub const STAR_RATING: &str = "star_rating";
pub const REVIEW_DATE: &str = "review_date";
pub const VERIFIED_PURCHASE: &str = "verified_purchase";
pub const HELPFUL_VOTES: &str = "helpful_votes";
pub const TOTAL_VOTES: &str = "total_votes";
pub const REVIEW_HEADLINE: &str = "review_headline";
pub const REVIEW_BODY: &str = "review_body";

/// Value of `verified_purchase` for verified reviews
pub const VERIFIED: &str = "Y";

/// A product review as stored in the `reviews` collection
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub review_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub product_title: String,
    pub product_category: String,
    /// Integer 1-5, string-encoded
    pub star_rating: String,
    /// `YYYY-MM-DD`, not guaranteed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_date: Option<String>,
    /// "Y" or "N"
    pub verified_purchase: String,
    pub helpful_votes: String,
    pub total_votes: String,
    #[serde(default)]
    pub review_headline: String,
    #[serde(default)]
    pub review_body: String,
}

impl Review {
    pub fn to_document(&self) -> Document {
        bson::to_document(self).unwrap_or_default()
    }
}

/// Convert a stored value to an integer the way `$convert { to: "int",
/// onError: 0, onNull: 0 }` does: numbers are truncated, booleans become 0/1,
/// strings must hold a plain base-10 integer. Anything else yields 0.
pub fn coerce_int(value: Option<&Bson>) -> i32 {
    match value {
        Some(Bson::Int32(v)) => *v,
        Some(Bson::Int64(v)) => i32::try_from(*v).unwrap_or(0),
        Some(Bson::Double(v)) if v.is_finite() => {
            let truncated = v.trunc();
            if truncated >= f64::from(i32::MIN) && truncated <= f64::from(i32::MAX) {
                truncated as i32
            } else {
                0
            }
        }
        Some(Bson::Boolean(v)) => i32::from(*v),
        Some(Bson::String(s)) => s.parse::<i32>().unwrap_or(0),
        _ => 0,
    }
}
