//! Query-string parameters shared by the analytics endpoints.
//!
//! Parameters arrive as raw strings and are read leniently: a malformed value
//! falls back to the endpoint's default instead of rejecting the request.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    query::{category::requested_category, DateSelector, PageRequest},
    services::analytics::TimeScope,
};

/// Per-endpoint defaults for missing or malformed parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDefaults {
    pub limit: u64,
    pub weeks_back: u32,
}

pub const BOT_DATA: EndpointDefaults = EndpointDefaults { limit: 25, weeks_back: 1 };
pub const BOT_STATS_WEEKS_BACK: u32 = 1;
pub const TRENDING_PRODUCTS: EndpointDefaults = EndpointDefaults { limit: 25, weeks_back: 1 };
pub const VERIFIED: EndpointDefaults = EndpointDefaults { limit: 5, weeks_back: 1 };
pub const HELPFUL_REVIEWS: EndpointDefaults = EndpointDefaults { limit: 5, weeks_back: 1 };
/// Largest page any endpoint serves, whatever the configuration says
pub const PAGE_LIMIT_CEILING: u64 = 100;

/// Controversial reviews are rarer, so the default window is wider
pub const CONTROVERSIAL_REVIEWS: EndpointDefaults = EndpointDefaults { limit: 5, weeks_back: 5 };

/// Time window, category and pagination parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WindowParams {
    /// 1-based page number (default: 1)
    pub page: Option<String>,
    /// Page size, clamped to the configured maximum
    pub limit: Option<String>,
    /// Weeks before the dataset's latest date
    pub weeks_back: Option<String>,
    /// Calendar year; takes precedence over weeksBack when in (1900, 2100)
    pub year: Option<String>,
    /// Month of `year`, 1-12
    pub month: Option<String>,
    /// Week of the month, 1-5
    pub week: Option<String>,
    /// Product category; "All" or empty means no filter
    pub category: Option<String>,
}

impl WindowParams {
    /// Resolve the time scope, keeping the category filter
    pub fn scope(&self, defaults: EndpointDefaults) -> TimeScope {
        let weeks_back = weeks_back_or(self.weeks_back.as_deref(), defaults.weeks_back);
        TimeScope {
            selector: DateSelector::from_parts(
                weeks_back,
                parse_int(self.year.as_deref()),
                parse_int(self.month.as_deref()),
                parse_int(self.week.as_deref()),
            ),
            weeks_back,
            default_weeks: defaults.weeks_back,
            category: requested_category(self.category.as_deref()),
        }
    }

    pub fn page(&self, defaults: EndpointDefaults, max_limit: u64) -> PageRequest {
        page_request(
            self.page.as_deref(),
            self.limit.as_deref(),
            defaults.limit,
            max_limit,
        )
    }
}

/// Bot statistics only take a weeks-back window
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WeeksBackParams {
    /// Weeks before the dataset's latest date (default: 1)
    pub weeks_back: Option<String>,
}

impl WeeksBackParams {
    pub fn scope(&self, default_weeks: u32) -> TimeScope {
        let weeks_back = weeks_back_or(self.weeks_back.as_deref(), default_weeks);
        TimeScope {
            selector: DateSelector::WeeksBack(weeks_back),
            weeks_back,
            default_weeks,
            category: None,
        }
    }
}

/// Read an integer the way a lenient `parseInt` does: optional leading
/// whitespace and sign, then as many digits as are present.
pub fn parse_int(raw: Option<&str>) -> Option<i64> {
    let trimmed = raw?.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let value = rest[..digits].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

fn weeks_back_or(raw: Option<&str>, default: u32) -> u32 {
    parse_int(raw)
        .filter(|weeks| *weeks >= 1)
        .and_then(|weeks| u32::try_from(weeks).ok())
        .unwrap_or(default)
}

/// Page defaults to 1; limit is clamped to `[1, max_limit]`, and `max_limit`
/// itself to [`PAGE_LIMIT_CEILING`]. Zero or unreadable values take the
/// default, like `parseInt(x) || default`.
pub fn page_request(
    page: Option<&str>,
    limit: Option<&str>,
    default_limit: u64,
    max_limit: u64,
) -> PageRequest {
    let max_limit = max_limit.clamp(1, PAGE_LIMIT_CEILING);
    let page = parse_int(page)
        .filter(|p| *p != 0)
        .map(|p| p.max(1) as u64)
        .unwrap_or(1);
    let limit = parse_int(limit)
        .filter(|l| *l != 0)
        .map(|l| l.clamp(1, max_limit as i64) as u64)
        .unwrap_or(default_limit)
        .clamp(1, max_limit);
    PageRequest { page, limit }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_is_lenient() {
        assert_eq!(parse_int(Some("12")), Some(12));
        assert_eq!(parse_int(Some("  7")), Some(7));
        assert_eq!(parse_int(Some("12abc")), Some(12));
        assert_eq!(parse_int(Some("-3")), Some(-3));
        assert_eq!(parse_int(Some("+4")), Some(4));
        assert_eq!(parse_int(Some("abc")), None);
        assert_eq!(parse_int(Some("")), None);
        assert_eq!(parse_int(Some("-")), None);
        assert_eq!(parse_int(None), None);
        assert_eq!(parse_int(Some("99999999999999999999")), None);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(page_request(None, Some("500"), 25, 100).limit, 100);
        assert_eq!(page_request(None, Some("-5"), 25, 100).limit, 1);
        assert_eq!(page_request(None, Some("0"), 25, 100).limit, 25);
        assert_eq!(page_request(None, Some("ten"), 5, 100).limit, 5);
        assert_eq!(page_request(None, None, 25, 100).limit, 25);
    }

    #[test]
    fn test_configured_limit_cannot_exceed_ceiling() {
        assert_eq!(page_request(None, Some("500"), 25, 1_000).limit, PAGE_LIMIT_CEILING);
        assert_eq!(page_request(None, None, 250, 1_000).limit, PAGE_LIMIT_CEILING);
        assert_eq!(page_request(None, Some("50"), 25, 0).limit, 1);
    }

    #[test]
    fn test_page_defaults_to_first() {
        assert_eq!(page_request(Some("3"), None, 5, 100).page, 3);
        assert_eq!(page_request(Some("0"), None, 5, 100).page, 1);
        assert_eq!(page_request(Some("-2"), None, 5, 100).page, 1);
        assert_eq!(page_request(Some("x"), None, 5, 100).page, 1);
    }

    #[test]
    fn test_scope_prefers_valid_year() {
        let params = WindowParams {
            weeks_back: Some("3".into()),
            year: Some("2014".into()),
            month: Some("13".into()),
            week: Some("2".into()),
            category: Some("Books".into()),
            ..Default::default()
        };
        let scope = params.scope(HELPFUL_REVIEWS);
        assert_eq!(
            scope.selector,
            DateSelector::Explicit {
                year: 2014,
                month: None,
                week: Some(2)
            }
        );
        assert_eq!(scope.weeks_back, 3);
        assert_eq!(scope.category.as_deref(), Some("Books"));
    }

    #[test]
    fn test_scope_defaults() {
        let params = WindowParams {
            weeks_back: Some("0".into()),
            year: Some("1800".into()),
            category: Some("All".into()),
            ..Default::default()
        };
        let scope = params.scope(CONTROVERSIAL_REVIEWS);
        assert_eq!(scope.selector, DateSelector::WeeksBack(5));
        assert_eq!(scope.default_weeks, 5);
        assert!(scope.category.is_none());
    }

    #[test]
    fn test_bot_stats_scope_ignores_everything_else() {
        let scope = WeeksBackParams {
            weeks_back: Some("2".into()),
        }
        .scope(BOT_STATS_WEEKS_BACK);
        assert_eq!(scope.selector, DateSelector::WeeksBack(2));
        assert!(scope.category.is_none());
    }
}
