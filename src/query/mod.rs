//! Sampling-and-pagination query layer.
//!
//! Request flow: resolve a date window, count the matching reviews, plan a
//! sample window, build the analytic's pipeline, run it, and wrap the rows
//! with pagination metadata.

pub mod builder;
pub mod category;
pub mod date_window;
pub mod fallback;
pub mod pipeline;
pub mod response;
pub mod sampling;

pub use date_window::{DateSelector, DateWindow, DateWindowResolver};
pub use fallback::try_or_else;
pub use pipeline::{Filter, KeySpec, Pipeline, SortOrder};
pub use response::{Completeness, PageMeta, PageRequest};
pub use sampling::{SampleWindow, SamplingMode};
