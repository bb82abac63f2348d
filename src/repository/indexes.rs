//! Index specs backing the analytics queries

use crate::models::review::{
    CUSTOMER_ID, HELPFUL_VOTES, PRODUCT_CATEGORY, PRODUCT_ID, REVIEW_DATE, STAR_RATING,
    TOTAL_VOTES, VERIFIED_PURCHASE,
};
use crate::query::{KeySpec, SortOrder};

/// Compound indexes first, then single-field ones
pub fn review_indexes() -> Vec<KeySpec> {
    vec![
        // bot-data: category filter + date sort
        KeySpec::asc(PRODUCT_CATEGORY).then(REVIEW_DATE, SortOrder::Descending),
        // helpful/controversial vote ordering
        KeySpec::desc(TOTAL_VOTES).then(HELPFUL_VOTES, SortOrder::Descending),
        // trending: date window + product grouping
        KeySpec::desc(REVIEW_DATE).then(PRODUCT_ID, SortOrder::Ascending),
        KeySpec::asc(CUSTOMER_ID),
        KeySpec::asc(PRODUCT_ID),
        KeySpec::desc(REVIEW_DATE),
        KeySpec::asc(VERIFIED_PURCHASE),
        KeySpec::desc(TOTAL_VOTES),
        KeySpec::desc(HELPFUL_VOTES),
        KeySpec::asc(PRODUCT_CATEGORY),
        KeySpec::asc(STAR_RATING),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_index_names_are_unique() {
        let names: HashSet<String> = review_indexes().iter().map(KeySpec::name).collect();
        assert_eq!(names.len(), review_indexes().len());
        assert!(names.contains("product_category_1_review_date_-1"));
        assert!(names.contains("customer_id_1"));
    }
}
