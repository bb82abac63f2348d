//! Pagination metadata and response shaping.

use mongodb::bson::{Bson, Document};
use serde::Serialize;
use utoipa::ToSchema;

/// A validated page request; `page` is 1-based and `limit` already clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Documents to skip before this page
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Whether the total behind a page is exact or read from a sample window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Exact,
    /// The window itself may run out before the advertised page count does
    Sampled,
}

/// Pagination block shared by every paged response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
    /// Rows in this response
    pub returned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    pub has_more: bool,
}

impl PageMeta {
    /// Build page metadata. Without a known total, a full page is the only
    /// hint that more rows exist.
    pub fn new(
        request: &PageRequest,
        total: Option<u64>,
        returned: usize,
        completeness: Completeness,
    ) -> Self {
        let full_page = returned as u64 == request.limit;
        let (total_pages, has_more) = match total {
            Some(total) => {
                let pages = total_pages(total, request.limit);
                let more = request.page < pages
                    && (completeness == Completeness::Exact || full_page);
                (Some(pages), more)
            }
            None => (None, full_page),
        };
        Self {
            page: request.page,
            limit: request.limit,
            returned,
            total_pages,
            has_more,
        }
    }
}

/// `ceil(total / limit)`, 0 for an empty result
pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}

/// Format a count with thousands separators, e.g. `5,000,000`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Convert store documents into plain JSON rows for the client
pub fn to_json_rows(documents: Vec<Document>) -> Vec<serde_json::Value> {
    documents
        .into_iter()
        .map(|doc| Bson::Document(doc).into_relaxed_extjson())
        .collect()
}

/// Read an integer field from an aggregation result, 0 when absent
pub fn count_field(doc: Option<&Document>, field: &str) -> u64 {
    match doc.and_then(|d| d.get(field)) {
        Some(Bson::Int32(v)) => u64::try_from(*v).unwrap_or(0),
        Some(Bson::Int64(v)) => u64::try_from(*v).unwrap_or(0),
        Some(Bson::Double(v)) if *v >= 0.0 => *v as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn test_skip() {
        assert_eq!(PageRequest { page: 1, limit: 25 }.skip(), 0);
        assert_eq!(PageRequest { page: 4, limit: 25 }.skip(), 75);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 5), 0);
        assert_eq!(total_pages(20, 5), 4);
        assert_eq!(total_pages(21, 5), 5);
        assert_eq!(total_pages(1, 100), 1);
    }

    fn page_meta(
        page: u64,
        limit: u64,
        total: Option<u64>,
        returned: usize,
        completeness: Completeness,
    ) -> PageMeta {
        PageMeta::new(&PageRequest { page, limit }, total, returned, completeness)
    }

    #[test]
    fn test_has_more_exact() {
        let meta = page_meta(1, 5, Some(20), 5, Completeness::Exact);
        assert_eq!(meta.total_pages, Some(4));
        assert!(meta.has_more);

        let last = page_meta(4, 5, Some(20), 5, Completeness::Exact);
        assert!(!last.has_more);
    }

    #[test]
    fn test_has_more_sampled_requires_full_page() {
        let short = page_meta(1, 5, Some(20), 3, Completeness::Sampled);
        assert!(!short.has_more);
        let full = page_meta(1, 5, Some(20), 5, Completeness::Sampled);
        assert!(full.has_more);
    }

    #[test]
    fn test_unknown_total() {
        let meta = page_meta(2, 25, None, 25, Completeness::Sampled);
        assert_eq!(meta.total_pages, None);
        assert!(meta.has_more);
        let meta = page_meta(2, 25, None, 7, Completeness::Sampled);
        assert!(!meta.has_more);
    }

    #[test]
    fn test_page_meta_serializes_camel_case() {
        let meta = page_meta(1, 5, Some(20), 5, Completeness::Exact);
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "page": 1,
                "limit": 5,
                "returned": 5,
                "totalPages": 4,
                "hasMore": true
            })
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(5_123_456), "5,123,456");
    }

    #[test]
    fn test_json_rows_flatten_object_ids() {
        let id = ObjectId::new();
        let rows = to_json_rows(vec![doc! { "_id": id, "review_id": "R1", "n": 3 }]);
        assert_eq!(rows[0]["review_id"], "R1");
        assert_eq!(rows[0]["n"], 3);
        assert_eq!(rows[0]["_id"]["$oid"], id.to_hex());
    }

    #[test]
    fn test_count_field() {
        assert_eq!(count_field(Some(&doc! { "total": 20 }), "total"), 20);
        assert_eq!(count_field(Some(&doc! { "total": 20i64 }), "total"), 20);
        assert_eq!(count_field(Some(&doc! {}), "total"), 0);
        assert_eq!(count_field(None, "total"), 0);
    }
}
