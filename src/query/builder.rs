//! Pipelines for each analytic.
//!
//! Every analytic has one of three shapes:
//! - listing: match, sort, page, enrich, project
//! - sampled aggregate: match, sample window, group/facet (optionally paged)
//! - sampled ranking: match, ordered sample window, derive numbers, threshold,
//!   sort, page, project

use crate::models::review::{
    CUSTOMER_ID, HELPFUL_VOTES, ID, PRODUCT_CATEGORY, PRODUCT_ID, PRODUCT_TITLE, REVIEW_BODY,
    REVIEW_DATE, REVIEW_HEADLINE, REVIEW_ID, STAR_RATING, TOTAL_VOTES, VERIFIED,
    VERIFIED_PURCHASE,
};
use crate::query::pipeline::{
    Accumulator, Filter, GroupSpec, KeySpec, Pipeline, Projected, Projection, SortOrder, Stage,
};
use crate::query::response::PageRequest;
use crate::query::sampling::SampleWindow;

pub const USER_REVIEW_COUNT: &str = "user_review_count";
pub const HELPFUL_VOTES_NUM: &str = "helpful_votes_num";
pub const TOTAL_VOTES_NUM: &str = "total_votes_num";
pub const UNHELPFUL_VOTES_NUM: &str = "unhelpful_votes_num";
pub const UNHELPFUL_VOTES: &str = "unhelpful_votes";
pub const CONTROVERSY_SCORE: &str = "controversy_score";
pub const COUNT_FIELD: &str = "total";

/// Users with this many reviews in the sample are flagged as rapid-fire
pub const RAPID_FIRE_MIN_REVIEWS: i64 = 5;

/// Review filter for a date window and an optional category
pub fn review_filter(start_date: &str, end_date: &str, category: Option<&str>) -> Filter {
    let filter = Filter::new().date_range(REVIEW_DATE, start_date, end_date);
    match category {
        Some(category) => filter.equals(PRODUCT_CATEGORY, category),
        None => filter,
    }
}

/// Shared prefix of every sampled analytic: the matching set, optionally
/// put in a stable order, cut down to the sample window.
pub fn sampled(filter: &Filter, window: SampleWindow, order: Option<KeySpec>) -> Pipeline {
    let pipeline = Pipeline::new().matching(filter.clone());
    let pipeline = match order {
        Some(keys) => pipeline.sort(keys),
        None => pipeline,
    };
    pipeline.skip(window.offset).limit(window.size)
}

/// `limit(skip + limit) → skip → limit`, bounding memory before the skip
fn paged(pipeline: Pipeline, page: &PageRequest) -> Pipeline {
    pipeline
        .limit(page.skip().saturating_add(page.limit))
        .skip(page.skip())
        .limit(page.limit)
}

const LISTING_FIELDS: &[&str] = &[
    PRODUCT_TITLE,
    PRODUCT_CATEGORY,
    STAR_RATING,
    REVIEW_DATE,
    VERIFIED_PURCHASE,
    REVIEW_ID,
    PRODUCT_ID,
    HELPFUL_VOTES,
    TOTAL_VOTES,
    CUSTOMER_ID,
];

/// Raw review listing for bot inspection, each row enriched with its
/// author's total review count.
pub fn bot_listing(
    filter: &Filter,
    has_category: bool,
    page: &PageRequest,
    collection: &str,
) -> Pipeline {
    // Matches the {product_category: 1, review_date: -1} compound index
    let order = if has_category {
        KeySpec::asc(PRODUCT_CATEGORY).then(REVIEW_DATE, SortOrder::Descending)
    } else {
        KeySpec::desc(REVIEW_DATE)
    };
    let pipeline = Pipeline::new().matching(filter.clone()).sort(order.clone());
    let pipeline = if has_category {
        pipeline.with_hint(order)
    } else {
        pipeline
    };
    paged(pipeline, page)
        .stage(Stage::CountSameKey {
            field: USER_REVIEW_COUNT,
            key: CUSTOMER_ID,
            from: collection.to_string(),
        })
        .project(Projection::including(LISTING_FIELDS).with(Projected::Include(USER_REVIEW_COUNT)))
}

/// One-and-done and rapid-fire reviewer counts over the sample
pub fn bot_stats(filter: &Filter, window: SampleWindow) -> Pipeline {
    let reviewers_with = |condition: Filter| Pipeline::new().matching(condition).count(COUNT_FIELD);
    sampled(filter, window, None)
        .group(
            GroupSpec::by(CUSTOMER_ID)
                .with("reviewCount", Accumulator::Count)
                .with("firstDate", Accumulator::Min(REVIEW_DATE)),
        )
        .stage(Stage::Facet(vec![
            ("oneAndDone", reviewers_with(Filter::new().equals("reviewCount", 1))),
            (
                "rapidFire",
                reviewers_with(Filter::new().at_least("reviewCount", RAPID_FIRE_MIN_REVIEWS)),
            ),
        ]))
}

/// Products ranked by review count within the sample
pub fn trending_products(filter: &Filter, window: SampleWindow, page: &PageRequest) -> Pipeline {
    let grouped = sampled(filter, window, None)
        .group(
            GroupSpec::by(PRODUCT_ID)
                .with(PRODUCT_TITLE, Accumulator::First(PRODUCT_TITLE))
                .with(PRODUCT_CATEGORY, Accumulator::First(PRODUCT_CATEGORY))
                .with("review_count", Accumulator::Count)
                .with("avg_rating", Accumulator::AverageInt(STAR_RATING))
                .with("review_dates", Accumulator::Push(REVIEW_DATE)),
        )
        .sort(KeySpec::desc("review_count"));
    paged(grouped, page).project(
        Projection(vec![Projected::Rename {
            field: PRODUCT_ID,
            from: ID,
        }])
        .with(Projected::Include(PRODUCT_TITLE))
        .with(Projected::Include(PRODUCT_CATEGORY))
        .with(Projected::Include("review_count"))
        .with(Projected::Round {
            field: "avg_rating",
            places: 2,
        })
        .with(Projected::Include("review_dates"))
        .with(Projected::ExcludeId),
    )
}

/// Verified reviews of the sample; the flag is filtered after sampling so the
/// listing and the verification counts describe the same window.
pub fn verified_listing(filter: &Filter, window: SampleWindow, page: &PageRequest) -> Pipeline {
    let listing = sampled(filter, window, None)
        .matching(Filter::new().equals(VERIFIED_PURCHASE, VERIFIED))
        .project(Projection::including(&[
            PRODUCT_TITLE,
            PRODUCT_CATEGORY,
            STAR_RATING,
            REVIEW_DATE,
            REVIEW_ID,
            PRODUCT_ID,
        ]));
    paged(listing, page)
}

/// Number of reviews per `verified_purchase` value in the sample
pub fn verification_counts(filter: &Filter, window: SampleWindow) -> Pipeline {
    sampled(filter, window, None)
        .group(GroupSpec::by(VERIFIED_PURCHASE).with("count", Accumulator::Count))
}

/// Verified vs unverified comparison rows, "Y" first
pub fn verified_comparison(filter: &Filter, window: SampleWindow, page: &PageRequest) -> Pipeline {
    let grouped = sampled(filter, window, None)
        .group(
            GroupSpec::by(VERIFIED_PURCHASE)
                .with("count", Accumulator::Count)
                .with("avgRating", Accumulator::AverageInt(STAR_RATING))
                .with("avgHelpful", Accumulator::AverageInt(HELPFUL_VOTES)),
        )
        .sort(KeySpec::desc(ID))
        .project(
            Projection(vec![Projected::Rename {
                field: "verified",
                from: ID,
            }])
            .with(Projected::Include("count"))
            .with(Projected::Round {
                field: "avgRating",
                places: 2,
            })
            .with(Projected::Round {
                field: "avgHelpful",
                places: 2,
            })
            .with(Projected::ExcludeId),
        );
    paged(grouped, page)
}

/// The two vote-based review rankings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// Most helpful votes first
    Helpful,
    /// Largest share of unhelpful votes first
    Controversial,
}

impl Ranking {
    /// Minimum `total_votes` for a review to be ranked
    pub fn min_total_votes(self) -> i64 {
        match self {
            Ranking::Helpful => 5,
            Ranking::Controversial => 10,
        }
    }

    fn order(self) -> KeySpec {
        match self {
            Ranking::Helpful => {
                KeySpec::desc(HELPFUL_VOTES_NUM).then(TOTAL_VOTES_NUM, SortOrder::Descending)
            }
            Ranking::Controversial => {
                KeySpec::desc(CONTROVERSY_SCORE).then(TOTAL_VOTES_NUM, SortOrder::Descending)
            }
        }
    }

    /// Sample, numeric vote fields and the vote threshold
    fn eligible(self, filter: &Filter, window: SampleWindow) -> Pipeline {
        let pipeline = sampled(filter, window, Some(KeySpec::asc(ID)))
            .stage(Stage::CoerceInt {
                field: HELPFUL_VOTES_NUM,
                from: HELPFUL_VOTES,
            })
            .stage(Stage::CoerceInt {
                field: TOTAL_VOTES_NUM,
                from: TOTAL_VOTES,
            });
        let pipeline = match self {
            Ranking::Helpful => pipeline,
            Ranking::Controversial => pipeline.stage(Stage::Difference {
                field: UNHELPFUL_VOTES_NUM,
                minuend: TOTAL_VOTES_NUM,
                subtrahend: HELPFUL_VOTES_NUM,
            }),
        };
        pipeline.matching(Filter::new().at_least(TOTAL_VOTES_NUM, self.min_total_votes()))
    }

    /// One page of ranked reviews
    pub fn pipeline(self, filter: &Filter, window: SampleWindow, page: &PageRequest) -> Pipeline {
        let eligible = self.eligible(filter, window);
        let scored = match self {
            Ranking::Helpful => eligible,
            Ranking::Controversial => eligible.stage(Stage::Percentage {
                field: CONTROVERSY_SCORE,
                part: UNHELPFUL_VOTES_NUM,
                whole: TOTAL_VOTES_NUM,
                places: 1,
            }),
        };
        let projection = Projection::including(&[
            PRODUCT_TITLE,
            PRODUCT_CATEGORY,
            STAR_RATING,
            REVIEW_HEADLINE,
            REVIEW_BODY,
            REVIEW_DATE,
            REVIEW_ID,
            PRODUCT_ID,
            HELPFUL_VOTES,
            TOTAL_VOTES,
            CUSTOMER_ID,
        ]);
        let projection = match self {
            Ranking::Helpful => projection,
            Ranking::Controversial => projection
                .with(Projected::Rename {
                    field: UNHELPFUL_VOTES,
                    from: UNHELPFUL_VOTES_NUM,
                })
                .with(Projected::Include(CONTROVERSY_SCORE)),
        };
        scored
            .sort(self.order())
            .skip(page.skip())
            .limit(page.limit)
            .project(projection)
    }

    /// How many reviews of the sample clear the vote threshold
    pub fn count_pipeline(self, filter: &Filter, window: SampleWindow) -> Pipeline {
        self.eligible(filter, window).count(COUNT_FIELD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn window() -> SampleWindow {
        SampleWindow {
            offset: 120,
            size: 1000,
        }
    }

    fn stage_names(pipeline: &Pipeline) -> Vec<String> {
        pipeline
            .to_documents()
            .iter()
            .map(|d| d.keys().next().cloned().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_review_filter_with_category() {
        let filter = review_filter("2015-08-24", "2015-08-31", Some("Books"));
        assert_eq!(
            filter.to_document(),
            doc! {
                "review_date": { "$gte": "2015-08-24", "$lte": "2015-08-31" },
                "product_category": "Books"
            }
        );
        assert_eq!(review_filter("a", "b", None).conditions().len(), 1);
    }

    #[test]
    fn test_far_page_saturates_window() {
        let filter = review_filter("2015-08-24", "2015-08-31", None);
        let page = PageRequest {
            page: 9_223_372_036_854_775_807,
            limit: 100,
        };
        let docs = bot_listing(&filter, false, &page, "reviews").to_documents();
        assert_eq!(docs[2], doc! { "$limit": i64::MAX });
        assert_eq!(docs[3], doc! { "$skip": i64::MAX });
        assert_eq!(docs[4], doc! { "$limit": 100i64 });
    }

    #[test]
    fn test_bot_listing_shape() {
        let filter = review_filter("2015-08-24", "2015-08-31", Some("Books"));
        let page = PageRequest { page: 3, limit: 25 };
        let pipeline = bot_listing(&filter, true, &page, "reviews");
        assert_eq!(
            stage_names(&pipeline),
            vec![
                "$match",
                "$sort",
                "$limit",
                "$skip",
                "$limit",
                "$lookup",
                "$addFields",
                "$project"
            ]
        );
        let docs = pipeline.to_documents();
        assert_eq!(docs[2], doc! { "$limit": 75i64 });
        assert_eq!(docs[3], doc! { "$skip": 50i64 });
        assert_eq!(
            pipeline.hint().map(KeySpec::to_document),
            Some(doc! { "product_category": 1, "review_date": -1 })
        );

        let unfiltered = bot_listing(&review_filter("a", "b", None), false, &page, "reviews");
        assert!(unfiltered.hint().is_none());
        assert_eq!(unfiltered.to_documents()[1], doc! { "$sort": { "review_date": -1 } });
    }

    #[test]
    fn test_sampled_prefix() {
        let filter = review_filter("2015-08-24", "2015-08-31", None);
        let docs = sampled(&filter, window(), None).to_documents();
        assert_eq!(docs[1], doc! { "$skip": 120i64 });
        assert_eq!(docs[2], doc! { "$limit": 1000i64 });
    }

    #[test]
    fn test_bot_stats_shape() {
        let filter = review_filter("2015-08-24", "2015-08-31", None);
        assert_eq!(
            stage_names(&bot_stats(&filter, window())),
            vec!["$match", "$skip", "$limit", "$group", "$facet"]
        );
    }

    #[test]
    fn test_rankings_sort_by_id_before_sampling() {
        let filter = review_filter("2015-08-24", "2015-08-31", Some("Books"));
        let page = PageRequest { page: 1, limit: 5 };
        for ranking in [Ranking::Helpful, Ranking::Controversial] {
            let docs = ranking.pipeline(&filter, window(), &page).to_documents();
            assert_eq!(docs[1], doc! { "$sort": { "_id": 1 } });
            assert_eq!(docs[2], doc! { "$skip": 120i64 });
        }
    }

    #[test]
    fn test_controversial_pipeline_shape() {
        let filter = review_filter("2015-08-24", "2015-08-31", None);
        let page = PageRequest { page: 2, limit: 5 };
        let pipeline = Ranking::Controversial.pipeline(&filter, window(), &page);
        assert_eq!(
            stage_names(&pipeline),
            vec![
                "$match", "$sort", "$skip", "$limit", "$addFields", "$addFields", "$addFields",
                "$match", "$addFields", "$sort", "$skip", "$limit", "$project"
            ]
        );
        let docs = pipeline.to_documents();
        assert_eq!(docs[7], doc! { "$match": { "total_votes_num": { "$gte": 10i64 } } });
        assert_eq!(
            docs[9],
            doc! { "$sort": { "controversy_score": -1, "total_votes_num": -1 } }
        );
        assert_eq!(docs[10], doc! { "$skip": 5i64 });
    }

    #[test]
    fn test_count_pipeline_stops_at_threshold() {
        let filter = review_filter("2015-08-24", "2015-08-31", None);
        let names = stage_names(&Ranking::Helpful.count_pipeline(&filter, window()));
        assert_eq!(
            names,
            vec![
                "$match",
                "$sort",
                "$skip",
                "$limit",
                "$addFields",
                "$addFields",
                "$match",
                "$count"
            ]
        );
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(Ranking::Helpful.min_total_votes(), 5);
        assert_eq!(Ranking::Controversial.min_total_votes(), 10);
    }
}
