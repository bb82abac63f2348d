//! In-process review store.
//!
//! Evaluates the typed pipelines directly over BSON documents. It backs the
//! router tests and local demos, and can simulate an unreachable store.

use std::cmp::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use crate::{
    error::{AppError, AppResult},
    models::review::{coerce_int, ID, REVIEW_DATE},
    query::{
        date_window::is_iso_date,
        pipeline::{Accumulator, Condition, GroupSpec, Projected, Projection, Stage},
        Filter, KeySpec, Pipeline, SortOrder,
    },
};

use super::ReviewStore;

pub struct MemoryStore {
    collection: String,
    documents: Vec<Document>,
    reachable: bool,
    indexes: Mutex<Vec<KeySpec>>,
}

impl MemoryStore {
    /// Build a store over `documents`; each one without an `_id` gets a fresh
    /// ObjectId, so insertion order is also `_id` order.
    pub fn new(documents: Vec<Document>) -> Self {
        let documents = documents
            .into_iter()
            .map(|mut doc| {
                if !doc.contains_key(ID) {
                    doc.insert(ID, ObjectId::new());
                }
                doc
            })
            .collect();
        Self {
            collection: "reviews".to_string(),
            documents,
            reachable: true,
            indexes: Mutex::new(Vec::new()),
        }
    }

    /// A store whose every call fails, as if the server were down
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new(Vec::new())
        }
    }

    /// Indexes created so far
    pub fn indexes(&self) -> Vec<KeySpec> {
        self.indexes
            .lock()
            .map(|indexes| indexes.clone())
            .unwrap_or_default()
    }

    fn check(&self) -> AppResult<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(AppError::Store("server selection timed out".to_string()))
        }
    }

    fn run(&self, pipeline: &Pipeline, input: Vec<Document>) -> Vec<Document> {
        pipeline
            .stages()
            .iter()
            .fold(input, |docs, stage| self.apply(stage, docs))
    }

    fn apply(&self, stage: &Stage, docs: Vec<Document>) -> Vec<Document> {
        match stage {
            Stage::Match(filter) => docs.into_iter().filter(|d| matches(filter, d)).collect(),
            Stage::Sort(keys) => {
                let mut docs = docs;
                docs.sort_by(|a, b| compare_by(keys, a, b));
                docs
            }
            Stage::Skip(n) => docs.into_iter().skip(to_usize(*n)).collect(),
            Stage::Limit(n) => docs.into_iter().take(to_usize(*n)).collect(),
            Stage::CoerceInt { field, from } => map_docs(docs, |doc| {
                let value = coerce_int(doc.get(*from));
                doc.insert(*field, value);
            }),
            Stage::Difference {
                field,
                minuend,
                subtrahend,
            } => map_docs(docs, |doc| {
                let value = number(doc.get(*minuend)).unwrap_or(0.0)
                    - number(doc.get(*subtrahend)).unwrap_or(0.0);
                doc.insert(*field, value as i64);
            }),
            Stage::Percentage {
                field,
                part,
                whole,
                places,
            } => map_docs(docs, |doc| {
                let whole = number(doc.get(*whole)).unwrap_or(0.0);
                let value = if whole > 0.0 {
                    let part = number(doc.get(*part)).unwrap_or(0.0);
                    Bson::Double(round(part / whole * 100.0, *places))
                } else {
                    Bson::Int32(0)
                };
                doc.insert(*field, value);
            }),
            Stage::Group(spec) => group(spec, docs),
            Stage::Facet(branches) => {
                let mut out = Document::new();
                for (name, branch) in branches {
                    let rows: Vec<Bson> = self
                        .run(branch, docs.clone())
                        .into_iter()
                        .map(Bson::Document)
                        .collect();
                    out.insert(*name, rows);
                }
                vec![out]
            }
            Stage::Count(name) => {
                if docs.is_empty() {
                    Vec::new()
                } else {
                    let mut out = Document::new();
                    out.insert(*name, docs.len() as i32);
                    vec![out]
                }
            }
            Stage::CountSameKey { field, key, .. } => map_docs(docs, |doc| {
                let value = doc.get(*key).cloned().unwrap_or(Bson::Null);
                let count = self
                    .documents
                    .iter()
                    .filter(|other| other.get(*key).cloned().unwrap_or(Bson::Null) == value)
                    .count();
                doc.insert(*field, count.max(1) as i32);
            }),
            Stage::Project(projection) => docs.iter().map(|d| project(projection, d)).collect(),
        }
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn count_documents(&self, filter: &Filter) -> AppResult<u64> {
        self.check()?;
        Ok(self.documents.iter().filter(|d| matches(filter, d)).count() as u64)
    }

    async fn estimated_document_count(&self) -> AppResult<u64> {
        self.check()?;
        Ok(self.documents.len() as u64)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> AppResult<Vec<Document>> {
        self.check()?;
        Ok(self.run(pipeline, self.documents.clone()))
    }

    async fn distinct(&self, field: &str) -> AppResult<Vec<Bson>> {
        self.check()?;
        let mut values: Vec<Bson> = Vec::new();
        for value in self.documents.iter().filter_map(|d| d.get(field)) {
            if !values.contains(value) {
                values.push(value.clone());
            }
        }
        Ok(values)
    }

    async fn review_dates(&self, order: SortOrder, limit: i64) -> AppResult<Vec<String>> {
        self.check()?;
        let mut dates: Vec<String> = self
            .documents
            .iter()
            .filter_map(|d| d.get_str(REVIEW_DATE).ok())
            .filter(|date| is_iso_date(date))
            .map(str::to_string)
            .collect();
        dates.sort();
        if order == SortOrder::Descending {
            dates.reverse();
        }
        dates.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(dates)
    }

    async fn create_index(&self, keys: &KeySpec) -> AppResult<()> {
        self.check()?;
        let mut indexes = self
            .indexes
            .lock()
            .map_err(|_| AppError::Internal("index registry poisoned".to_string()))?;
        if !indexes.contains(keys) {
            indexes.push(keys.clone());
        }
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        self.check()
    }
}

fn map_docs(docs: Vec<Document>, mut f: impl FnMut(&mut Document)) -> Vec<Document> {
    docs.into_iter()
        .map(|mut doc| {
            f(&mut doc);
            doc
        })
        .collect()
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn matches(filter: &Filter, doc: &Document) -> bool {
    filter.conditions().iter().all(|condition| match condition {
        Condition::DateRange { field, start, end } => match doc.get(*field) {
            // Range filters only ever compare strings, like the server's type bracketing
            Some(Bson::String(value)) => {
                value.as_str() >= start.as_str() && value.as_str() <= end.as_str()
            }
            _ => false,
        },
        Condition::Equals { field, value } => doc
            .get(*field)
            .map(|actual| compare_values(actual, value) == Ordering::Equal)
            .unwrap_or(false),
        Condition::AtLeast { field, min } => number(doc.get(*field))
            .map(|n| n >= *min as f64)
            .unwrap_or(false),
    })
}

fn number(value: Option<&Bson>) -> Option<f64> {
    match value? {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Rank of a BSON type in the server's cross-type sort order
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        _ => 11,
    }
}

fn compare_values(a: &Bson, b: &Bson) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        _ => match (number(Some(a)), number(Some(b))) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn compare_by(keys: &KeySpec, a: &Document, b: &Document) -> Ordering {
    for (field, order) in keys.keys() {
        let left = a.get(*field).unwrap_or(&Bson::Null);
        let right = b.get(*field).unwrap_or(&Bson::Null);
        let ordering = match order {
            SortOrder::Ascending => compare_values(left, right),
            SortOrder::Descending => compare_values(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[derive(Default)]
struct GroupState {
    count: i64,
    firsts: IndexMap<&'static str, Bson>,
    mins: IndexMap<&'static str, Bson>,
    sums: IndexMap<&'static str, f64>,
    pushes: IndexMap<&'static str, Vec<Bson>>,
}

/// Group in first-seen key order
fn group(spec: &GroupSpec, docs: Vec<Document>) -> Vec<Document> {
    let mut groups: Vec<(Bson, GroupState)> = Vec::new();
    for doc in &docs {
        let key = doc.get(spec.key).cloned().unwrap_or(Bson::Null);
        let position = match groups.iter().position(|(k, _)| *k == key) {
            Some(position) => position,
            None => {
                groups.push((key, GroupState::default()));
                groups.len() - 1
            }
        };
        let state = &mut groups[position].1;
        state.count += 1;
        for (name, accumulator) in &spec.fields {
            match accumulator {
                Accumulator::Count => {}
                Accumulator::First(field) => {
                    state
                        .firsts
                        .entry(*name)
                        .or_insert_with(|| doc.get(*field).cloned().unwrap_or(Bson::Null));
                }
                Accumulator::Min(field) => {
                    if let Some(value) = doc.get(*field) {
                        let slot = state.mins.entry(*name).or_insert_with(|| value.clone());
                        if compare_values(value, slot) == Ordering::Less {
                            *slot = value.clone();
                        }
                    }
                }
                Accumulator::AverageInt(field) => {
                    let value = f64::from(coerce_int(doc.get(*field)));
                    *state.sums.entry(*name).or_insert(0.0) += value;
                }
                Accumulator::Push(field) => {
                    if let Some(value) = doc.get(*field) {
                        state.pushes.entry(*name).or_default().push(value.clone());
                    }
                }
            }
        }
    }

    groups
        .into_iter()
        .map(|(key, mut state)| {
            let mut out = Document::new();
            out.insert(ID, key);
            for (name, accumulator) in &spec.fields {
                let value = match accumulator {
                    Accumulator::Count => Bson::Int32(state.count as i32),
                    Accumulator::First(_) => {
                        state.firsts.shift_remove(name).unwrap_or(Bson::Null)
                    }
                    Accumulator::Min(_) => state.mins.shift_remove(name).unwrap_or(Bson::Null),
                    Accumulator::AverageInt(_) => {
                        let sum = state.sums.get(name).copied().unwrap_or(0.0);
                        Bson::Double(sum / state.count as f64)
                    }
                    Accumulator::Push(_) => {
                        Bson::Array(state.pushes.shift_remove(name).unwrap_or_default())
                    }
                };
                out.insert(*name, value);
            }
            out
        })
        .collect()
}

fn project(projection: &Projection, doc: &Document) -> Document {
    let mut out = Document::new();
    if !projection.excludes_id() {
        if let Some(id) = doc.get(ID) {
            out.insert(ID, id.clone());
        }
    }
    for item in &projection.0 {
        match item {
            Projected::Include(field) => {
                if let Some(value) = doc.get(*field) {
                    out.insert(*field, value.clone());
                }
            }
            Projected::Rename { field, from } => {
                if let Some(value) = doc.get(*from) {
                    out.insert(*field, value.clone());
                }
            }
            Projected::Round { field, places } => {
                let value = match number(doc.get(*field)) {
                    Some(n) => Bson::Double(round(n, *places)),
                    None => Bson::Null,
                };
                out.insert(*field, value);
            }
            Projected::ExcludeId => {}
        }
    }
    out
}
