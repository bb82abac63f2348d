//! Sample window planning.
//!
//! Sampled analytics read one contiguous slice of the matching documents
//! instead of all of them. The planner only decides where that slice starts;
//! the store truncates it naturally when fewer documents remain.

use rand::Rng;

/// How the window offset is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplingMode {
    /// Fresh uniform offset per call. Cheap, but two calls see different
    /// windows, so it only suits single-shot statistics.
    PseudoRandom,
    /// Offset derived from the query key, so every page of the same query
    /// reads the same window.
    Deterministic { query_key: String },
}

impl SamplingMode {
    /// Deterministic mode keyed on the resolved window and category filter
    pub fn keyed(start_date: &str, end_date: &str, category: Option<&str>) -> Self {
        SamplingMode::Deterministic {
            query_key: format!("{}-{}-{}", start_date, end_date, category.unwrap_or("All")),
        }
    }
}

/// Where a sample starts and how long it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    pub offset: u64,
    pub size: u64,
}

/// Plan a sample window using the thread-local RNG for pseudo-random mode
pub fn plan(total_matching: u64, sample_size: u64, mode: &SamplingMode) -> SampleWindow {
    plan_with_rng(total_matching, sample_size, mode, &mut rand::thread_rng())
}

pub fn plan_with_rng<R: Rng + ?Sized>(
    total_matching: u64,
    sample_size: u64,
    mode: &SamplingMode,
    rng: &mut R,
) -> SampleWindow {
    let offset = match mode {
        SamplingMode::PseudoRandom => {
            let span = total_matching.saturating_sub(sample_size);
            (rng.gen::<f64>() * span as f64).floor() as u64
        }
        SamplingMode::Deterministic { query_key } => {
            let span = total_matching.saturating_sub(sample_size).max(1);
            i64::from(query_hash(query_key)).unsigned_abs() % span
        }
    };
    SampleWindow {
        offset,
        size: sample_size,
    }
}

/// 32-bit rolling hash over UTF-16 code units: `h = h * 31 + c`, wrapping.
pub fn query_hash(key: &str) -> i32 {
    key.encode_utf16()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(i32::from(c)))
}
