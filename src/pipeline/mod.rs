//! Pipeline stages and the runs built from them.
//!
//! - `enumerate`: walk every page of a search
//! - `fetch_details`: per-listing lookups over a bounded pool
//! - `join`: left join summaries with detail sets into one table
//! - `scrape`: RE/MAX, ERA and full-pipeline runs
//! - `vectors`: description index build and query

mod details;
mod enumerate;
mod join;
pub mod pool;
pub mod scrape;
pub mod vectors;

pub use details::fetch_details;
pub use enumerate::enumerate;
pub use join::join;
pub use scrape::{PipelineSummary, run_era, run_pipeline, run_remax, run_remax_all};
pub use vectors::{VectorSummary, run_vectors, search_index};
