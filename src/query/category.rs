//! Category hygiene.
//!
//! `product_category` is noisy in the source data: HTML fragments, dates that
//! landed in the wrong column and near-empty strings all show up in a
//! `distinct` over the field.

use mongodb::bson::Bson;
use once_cell::sync::Lazy;
use regex::Regex;

/// Sentinel meaning "no category filter"
pub const ALL_CATEGORIES: &str = "All";

const MAX_CATEGORY_LEN: usize = 40;
const MIN_ALPHA_RATIO: f64 = 0.4;

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));
static HTML_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>|&#\d+;|&[a-z]+;").expect("valid html regex"));

/// Whether a distinct category value is fit to show in the dashboard
pub fn is_valid_category(value: &str) -> bool {
    if value.is_empty() || value == ALL_CATEGORIES {
        return false;
    }
    if DATE_PATTERN.is_match(value) || HTML_PATTERN.is_match(value) {
        return false;
    }
    let len = value.chars().count();
    if len > MAX_CATEGORY_LEN {
        return false;
    }
    let alpha = value.chars().filter(char::is_ascii_alphabetic).count();
    alpha >= 2 && alpha as f64 / len as f64 >= MIN_ALPHA_RATIO
}

/// Keep valid string categories, sorted, behind the "All" sentinel
pub fn clean_categories(values: Vec<Bson>) -> Vec<String> {
    let mut categories: Vec<String> = values
        .into_iter()
        .filter_map(|value| match value {
            Bson::String(s) if is_valid_category(&s) => Some(s),
            _ => None,
        })
        .collect();
    categories.sort();
    categories.dedup();

    let mut cleaned = Vec::with_capacity(categories.len() + 1);
    cleaned.push(ALL_CATEGORIES.to_string());
    cleaned.extend(categories);
    cleaned
}

/// Normalize a requested category: empty or "All" means no filter
pub fn requested_category(raw: Option<&str>) -> Option<String> {
    raw.filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_categories() {
        assert!(is_valid_category("Electronics"));
        assert!(is_valid_category("Home Improvement"));
        assert!(is_valid_category("PC"));
    }

    #[test]
    fn test_rejects_noise() {
        assert!(!is_valid_category(""));
        assert!(!is_valid_category("All"));
        assert!(!is_valid_category("2015-08-01"));
        assert!(!is_valid_category("<b>bad</b>"));
        assert!(!is_valid_category("Toys &amp; Games"));
        assert!(!is_valid_category("Books &#39;n more"));
        assert!(!is_valid_category("X"));
        assert!(!is_valid_category("a1-2-3-4-5-6"));
        assert!(!is_valid_category(&"Electronics".repeat(4)));
    }

    #[test]
    fn test_alpha_ratio_boundary() {
        // 2 letters out of 5 characters is exactly 40%
        assert!(is_valid_category("ab123"));
        assert!(!is_valid_category("ab1234"));
    }

    #[test]
    fn test_clean_categories() {
        let raw = vec![
            Bson::String("Electronics".into()),
            Bson::String("2015-08-01".into()),
            Bson::String("<b>bad</b>".into()),
            Bson::String("".into()),
            Bson::Null,
            Bson::Int32(3),
        ];
        assert_eq!(clean_categories(raw), vec!["All", "Electronics"]);
    }

    #[test]
    fn test_clean_categories_sorted() {
        let raw = vec![
            Bson::String("Toys".into()),
            Bson::String("Books".into()),
            Bson::String("All".into()),
            Bson::String("Music".into()),
        ];
        assert_eq!(clean_categories(raw), vec!["All", "Books", "Music", "Toys"]);
    }

    #[test]
    fn test_requested_category() {
        assert_eq!(requested_category(None), None);
        assert_eq!(requested_category(Some("")), None);
        assert_eq!(requested_category(Some("All")), None);
        assert_eq!(requested_category(Some("Books")), Some("Books".to_string()));
    }
}
