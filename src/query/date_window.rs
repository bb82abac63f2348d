//! Date windows for time-scoped analytics.
//!
//! Every window is anchored to the dataset's latest known date rather than the
//! wall clock; no query is issued to discover it.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How the caller picked the time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelector {
    /// The last `n` weeks up to the dataset anchor
    WeeksBack(u32),
    /// A calendar year, optionally narrowed to a month and a week of that month
    Explicit {
        year: i32,
        month: Option<u32>,
        week: Option<u32>,
    },
}

impl DateSelector {
    /// Build a selector from already-parsed request values.
    ///
    /// The explicit form wins only when `year` lies in (1900, 2100); month and
    /// week are dropped individually when out of range. A week whose month was
    /// dropped falls in January of `year`; month 13 never rolls into the next year.
    pub fn from_parts(
        weeks_back: u32,
        year: Option<i64>,
        month: Option<i64>,
        week: Option<i64>,
    ) -> Self {
        match year {
            Some(y) if y > 1900 && y < 2100 => DateSelector::Explicit {
                year: y as i32,
                month: month.filter(|m| (1..=12).contains(m)).map(|m| m as u32),
                week: week.filter(|w| (1..=5).contains(w)).map(|w| w as u32),
            },
            _ => DateSelector::WeeksBack(weeks_back),
        }
    }
}

/// Inclusive date range, rendered as `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub start_date: String,
    pub end_date: String,
}

impl DateWindow {
    fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: end.format(DATE_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DateWindowResolver {
    anchor: NaiveDate,
}

impl DateWindowResolver {
    pub fn new(anchor: NaiveDate) -> Self {
        Self { anchor }
    }

    /// Resolve a selector to a concrete window. Never fails: an explicit
    /// selector that cannot be represented collapses to `fallback_weeks`
    /// before the anchor, and so does an oversized weeks-back value.
    pub fn resolve(&self, selector: &DateSelector, fallback_weeks: u32) -> DateWindow {
        let explicit = match *selector {
            DateSelector::Explicit { year, month, week } => explicit_window(year, month, week),
            DateSelector::WeeksBack(_) => None,
        };
        explicit
            .or_else(|| match *selector {
                DateSelector::WeeksBack(weeks) => self.weeks_back(weeks),
                DateSelector::Explicit { .. } => None,
            })
            .or_else(|| self.weeks_back(fallback_weeks))
            .unwrap_or_else(|| DateWindow::new(self.anchor, self.anchor))
    }

    fn weeks_back(&self, weeks: u32) -> Option<DateWindow> {
        let start = self
            .anchor
            .checked_sub_signed(Duration::days(i64::from(weeks) * 7))?;
        Some(DateWindow::new(start, self.anchor))
    }
}

/// Year, month or week-of-month window.
///
/// Week `w` starts on day `(w-1)*7+1` and lasts seven days; neither end is
/// clamped to the month, so late weeks of short months run into the next one.
fn explicit_window(year: i32, month: Option<u32>, week: Option<u32>) -> Option<DateWindow> {
    if let Some(w) = week {
        let first = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), 1)?;
        let start = first.checked_add_signed(Duration::days(i64::from(w.saturating_sub(1)) * 7))?;
        let end = start.checked_add_signed(Duration::days(6))?;
        return Some(DateWindow::new(start, end));
    }
    if let Some(m) = month {
        let start = NaiveDate::from_ymd_opt(year, m, 1)?;
        let next = if m == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, m + 1, 1)?
        };
        let end = next.pred_opt()?;
        debug_assert_eq!(end.month(), m);
        return Some(DateWindow::new(start, end));
    }
    Some(DateWindow::new(
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// True for strings shaped exactly like `YYYY-MM-DD`
pub fn is_iso_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> DateWindowResolver {
        DateWindowResolver::new(NaiveDate::from_ymd_opt(2015, 8, 31).unwrap())
    }

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow {
            start_date: start.into(),
            end_date: end.into(),
        }
    }

    #[test]
    fn test_weeks_back_is_anchored() {
        let r = resolver();
        assert_eq!(
            r.resolve(&DateSelector::WeeksBack(1), 1),
            window("2015-08-24", "2015-08-31")
        );
        assert_eq!(
            r.resolve(&DateSelector::WeeksBack(5), 1),
            window("2015-07-27", "2015-08-31")
        );
        assert_eq!(
            r.resolve(&DateSelector::WeeksBack(0), 1),
            window("2015-08-31", "2015-08-31")
        );
    }

    #[test]
    fn test_weeks_back_matches_day_arithmetic() {
        let r = resolver();
        let anchor = NaiveDate::from_ymd_opt(2015, 8, 31).unwrap();
        for weeks in [1u32, 2, 4, 12, 52, 260] {
            let w = r.resolve(&DateSelector::WeeksBack(weeks), 1);
            assert_eq!(w.end_date, "2015-08-31");
            let start = NaiveDate::parse_from_str(&w.start_date, DATE_FORMAT).unwrap();
            assert_eq!((anchor - start).num_days(), i64::from(weeks) * 7);
        }
    }

    #[test]
    fn test_whole_year() {
        let w = resolver().resolve(
            &DateSelector::Explicit {
                year: 2014,
                month: None,
                week: None,
            },
            1,
        );
        assert_eq!(w, window("2014-01-01", "2014-12-31"));
    }

    #[test]
    fn test_month_handles_leap_years() {
        let r = resolver();
        let feb = |year| DateSelector::Explicit {
            year,
            month: Some(2),
            week: None,
        };
        assert_eq!(r.resolve(&feb(2012), 1), window("2012-02-01", "2012-02-29"));
        assert_eq!(r.resolve(&feb(2015), 1), window("2015-02-01", "2015-02-28"));
        let dec = DateSelector::Explicit {
            year: 2013,
            month: Some(12),
            week: None,
        };
        assert_eq!(r.resolve(&dec, 1), window("2013-12-01", "2013-12-31"));
    }

    #[test]
    fn test_week_of_month() {
        let r = resolver();
        let sel = DateSelector::Explicit {
            year: 2015,
            month: Some(3),
            week: Some(2),
        };
        assert_eq!(r.resolve(&sel, 1), window("2015-03-08", "2015-03-14"));
    }

    #[test]
    fn test_late_week_spills_into_next_month() {
        let r = resolver();
        let sel = DateSelector::Explicit {
            year: 2015,
            month: Some(2),
            week: Some(4),
        };
        assert_eq!(r.resolve(&sel, 1), window("2015-02-22", "2015-02-28"));
        let sel = DateSelector::Explicit {
            year: 2015,
            month: Some(2),
            week: Some(5),
        };
        assert_eq!(r.resolve(&sel, 1), window("2015-03-01", "2015-03-07"));
    }

    #[test]
    fn test_week_without_month_uses_january() {
        let sel = DateSelector::Explicit {
            year: 2015,
            month: None,
            week: Some(1),
        };
        assert_eq!(resolver().resolve(&sel, 1), window("2015-01-01", "2015-01-07"));
    }

    #[test]
    fn test_month_thirteen_stays_in_year() {
        let sel = DateSelector::from_parts(1, Some(2015), Some(13), Some(2));
        assert_eq!(resolver().resolve(&sel, 1), window("2015-01-08", "2015-01-14"));
    }

    #[test]
    fn test_every_explicit_window_is_ordered() {
        let r = resolver();
        for year in [1901, 1999, 2000, 2015, 2099] {
            for month in (1..=12).map(Some).chain([None]) {
                for week in (1..=5).map(Some).chain([None]) {
                    let w = r.resolve(&DateSelector::Explicit { year, month, week }, 1);
                    assert!(is_iso_date(&w.start_date), "{:?}", w);
                    assert!(is_iso_date(&w.end_date), "{:?}", w);
                    assert!(w.start_date <= w.end_date, "{:?}", w);
                }
            }
        }
    }

    #[test]
    fn test_selector_validation() {
        assert_eq!(
            DateSelector::from_parts(3, Some(1900), Some(5), None),
            DateSelector::WeeksBack(3)
        );
        assert_eq!(
            DateSelector::from_parts(3, Some(2100), None, None),
            DateSelector::WeeksBack(3)
        );
        assert_eq!(
            DateSelector::from_parts(3, None, Some(5), Some(2)),
            DateSelector::WeeksBack(3)
        );
        assert_eq!(
            DateSelector::from_parts(3, Some(2015), Some(13), Some(6)),
            DateSelector::Explicit {
                year: 2015,
                month: None,
                week: None
            }
        );
        assert_eq!(
            DateSelector::from_parts(3, Some(2015), Some(8), Some(5)),
            DateSelector::Explicit {
                year: 2015,
                month: Some(8),
                week: Some(5)
            }
        );
    }

    #[test]
    fn test_oversized_weeks_back_falls_back() {
        let w = resolver().resolve(&DateSelector::WeeksBack(u32::MAX), 1);
        assert_eq!(w, window("2015-08-24", "2015-08-31"));
    }

    #[test]
    fn test_is_iso_date() {
        assert!(is_iso_date("2015-08-01"));
        assert!(!is_iso_date("2015-8-01"));
        assert!(!is_iso_date("15-08-2015"));
        assert!(!is_iso_date(""));
        assert!(!is_iso_date("2015-08-01T00:00"));
    }
}
