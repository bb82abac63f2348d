//! Typed aggregation pipelines.
//!
//! Pipelines are built as a small AST so the same description can be rendered
//! to MongoDB stages or evaluated in-process by the memory store.

use mongodb::bson::{doc, Bson, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_i32(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// Ordered list of keys, used for sorts, index specs and hints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec(pub Vec<(&'static str, SortOrder)>);

impl KeySpec {
    pub fn asc(field: &'static str) -> Self {
        KeySpec(vec![(field, SortOrder::Ascending)])
    }

    pub fn desc(field: &'static str) -> Self {
        KeySpec(vec![(field, SortOrder::Descending)])
    }

    pub fn then(mut self, field: &'static str, order: SortOrder) -> Self {
        self.0.push((field, order));
        self
    }

    pub fn keys(&self) -> &[(&'static str, SortOrder)] {
        &self.0
    }

    /// Index name as the server would generate it, e.g. `review_date_-1`
    pub fn name(&self) -> String {
        self.0
            .iter()
            .map(|(field, order)| format!("{}_{}", field, order.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for (field, order) in &self.0 {
            doc.insert(*field, order.as_i32());
        }
        doc
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Inclusive lexicographic range over a `YYYY-MM-DD` string field
    DateRange {
        field: &'static str,
        start: String,
        end: String,
    },
    Equals {
        field: &'static str,
        value: Bson,
    },
    AtLeast {
        field: &'static str,
        min: i64,
    },
}

/// Conjunction of conditions, rendered as a single `$match` document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_range(self, field: &'static str, start: &str, end: &str) -> Self {
        self.and(Condition::DateRange {
            field,
            start: start.to_string(),
            end: end.to_string(),
        })
    }

    pub fn equals(self, field: &'static str, value: impl Into<Bson>) -> Self {
        self.and(Condition::Equals {
            field,
            value: value.into(),
        })
    }

    pub fn at_least(self, field: &'static str, min: i64) -> Self {
        self.and(Condition::AtLeast { field, min })
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for condition in &self.conditions {
            match condition {
                Condition::DateRange { field, start, end } => {
                    doc.insert(*field, doc! { "$gte": start, "$lte": end });
                }
                Condition::Equals { field, value } => {
                    doc.insert(*field, value.clone());
                }
                Condition::AtLeast { field, min } => {
                    doc.insert(*field, doc! { "$gte": *min });
                }
            }
        }
        doc
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count,
    First(&'static str),
    Min(&'static str),
    /// Average of the field coerced to an integer (0 on failure)
    AverageInt(&'static str),
    Push(&'static str),
}

impl Accumulator {
    fn to_bson(&self) -> Bson {
        let doc = match self {
            Accumulator::Count => doc! { "$sum": 1 },
            Accumulator::First(field) => doc! { "$first": field_ref(field) },
            Accumulator::Min(field) => doc! { "$min": field_ref(field) },
            Accumulator::AverageInt(field) => doc! {
                "$avg": { "$convert": { "input": field_ref(field), "to": "int", "onError": 0 } }
            },
            Accumulator::Push(field) => doc! { "$push": field_ref(field) },
        };
        Bson::Document(doc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub key: &'static str,
    pub fields: Vec<(&'static str, Accumulator)>,
}

impl GroupSpec {
    pub fn by(key: &'static str) -> Self {
        Self {
            key,
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, name: &'static str, accumulator: Accumulator) -> Self {
        self.fields.push((name, accumulator));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projected {
    Include(&'static str),
    /// Output `field` taken from another field of the input
    Rename {
        field: &'static str,
        from: &'static str,
    },
    Round {
        field: &'static str,
        places: i32,
    },
    ExcludeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection(pub Vec<Projected>);

impl Projection {
    pub fn including(fields: &[&'static str]) -> Self {
        Projection(fields.iter().copied().map(Projected::Include).collect())
    }

    pub fn with(mut self, item: Projected) -> Self {
        self.0.push(item);
        self
    }

    pub fn excludes_id(&self) -> bool {
        self.0.iter().any(|p| matches!(p, Projected::ExcludeId))
    }

    fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for item in &self.0 {
            match item {
                Projected::Include(field) => {
                    doc.insert(*field, 1);
                }
                Projected::Rename { field, from } => {
                    doc.insert(*field, field_ref(from));
                }
                Projected::Round { field, places } => {
                    doc.insert(*field, doc! { "$round": [field_ref(field), *places] });
                }
                Projected::ExcludeId => {
                    doc.insert("_id", 0);
                }
            }
        }
        doc
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Sort(KeySpec),
    Skip(u64),
    Limit(u64),
    /// `field = int(from)`, 0 when the source is missing or not numeric
    CoerceInt {
        field: &'static str,
        from: &'static str,
    },
    Difference {
        field: &'static str,
        minuend: &'static str,
        subtrahend: &'static str,
    },
    /// `field = round(part / whole * 100, places)`, 0 when `whole` is not positive
    Percentage {
        field: &'static str,
        part: &'static str,
        whole: &'static str,
        places: i32,
    },
    Group(GroupSpec),
    Facet(Vec<(&'static str, Pipeline)>),
    Count(&'static str),
    /// Per-document correlated lookup: how many documents of the collection
    /// share this document's `key` value (1 when the lookup finds nothing)
    CountSameKey {
        field: &'static str,
        key: &'static str,
        from: String,
    },
    Project(Projection),
}

impl Stage {
    fn to_documents(&self) -> Vec<Document> {
        match self {
            Stage::Match(filter) => vec![doc! { "$match": filter.to_document() }],
            Stage::Sort(keys) => vec![doc! { "$sort": keys.to_document() }],
            Stage::Skip(n) => vec![doc! { "$skip": to_i64(*n) }],
            Stage::Limit(n) => vec![doc! { "$limit": to_i64(*n) }],
            Stage::CoerceInt { field, from } => vec![doc! {
                "$addFields": {
                    *field: {
                        "$convert": {
                            "input": field_ref(from),
                            "to": "int",
                            "onError": 0,
                            "onNull": 0
                        }
                    }
                }
            }],
            Stage::Difference {
                field,
                minuend,
                subtrahend,
            } => vec![doc! {
                "$addFields": {
                    *field: { "$subtract": [field_ref(minuend), field_ref(subtrahend)] }
                }
            }],
            Stage::Percentage {
                field,
                part,
                whole,
                places,
            } => vec![doc! {
                "$addFields": {
                    *field: {
                        "$cond": [
                            { "$gt": [field_ref(whole), 0] },
                            { "$round": [
                                { "$multiply": [
                                    { "$divide": [field_ref(part), field_ref(whole)] },
                                    100
                                ] },
                                *places
                            ] },
                            0
                        ]
                    }
                }
            }],
            Stage::Group(spec) => {
                let mut group = doc! { "_id": field_ref(spec.key) };
                for (name, accumulator) in &spec.fields {
                    group.insert(*name, accumulator.to_bson());
                }
                vec![doc! { "$group": group }]
            }
            Stage::Facet(branches) => {
                let mut facet = Document::new();
                for (name, pipeline) in branches {
                    let stages: Vec<Bson> =
                        pipeline.to_documents().into_iter().map(Bson::Document).collect();
                    facet.insert(*name, stages);
                }
                vec![doc! { "$facet": facet }]
            }
            Stage::Count(name) => vec![doc! { "$count": *name }],
            Stage::CountSameKey { field, key, from } => {
                let correlated = format!("$${}", LOOKUP_VAR);
                vec![
                    doc! {
                        "$lookup": {
                            "from": from.as_str(),
                            "let": { LOOKUP_VAR: field_ref(key) },
                            "pipeline": [
                                { "$match": { "$expr": { "$eq": [field_ref(key), correlated] } } },
                                { "$count": "count" }
                            ],
                            "as": *field
                        }
                    },
                    doc! {
                        "$addFields": {
                            *field: {
                                "$ifNull": [{ "$arrayElemAt": [format!("${}.count", field), 0] }, 1]
                            }
                        }
                    },
                ]
            }
            Stage::Project(projection) => vec![doc! { "$project": projection.to_document() }],
        }
    }
}

const LOOKUP_VAR: &str = "key";

/// An ordered list of stages plus an optional index hint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
    hint: Option<KeySpec>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn matching(self, filter: Filter) -> Self {
        self.stage(Stage::Match(filter))
    }

    pub fn sort(self, keys: KeySpec) -> Self {
        self.stage(Stage::Sort(keys))
    }

    pub fn skip(self, n: u64) -> Self {
        self.stage(Stage::Skip(n))
    }

    pub fn limit(self, n: u64) -> Self {
        self.stage(Stage::Limit(n))
    }

    pub fn group(self, spec: GroupSpec) -> Self {
        self.stage(Stage::Group(spec))
    }

    pub fn project(self, projection: Projection) -> Self {
        self.stage(Stage::Project(projection))
    }

    pub fn count(self, name: &'static str) -> Self {
        self.stage(Stage::Count(name))
    }

    pub fn with_hint(mut self, hint: KeySpec) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn hint(&self) -> Option<&KeySpec> {
        self.hint.as_ref()
    }

    /// Render to MongoDB aggregation stages
    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().flat_map(Stage::to_documents).collect()
    }
}

fn field_ref(field: &str) -> String {
    format!("${}", field)
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
