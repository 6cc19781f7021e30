// src/pipeline/enumerate.rs

//! Listing enumeration: page 1 first, then the remaining pages in parallel.

use std::collections::HashSet;

use crate::models::ListingSummary;
use crate::services::SearchSource;

use super::pool::{Order, keep_successes, run_bounded};

/// Collect the summaries of every page of a search, reading at most
/// `max_pages` pages.
///
/// A failed first page yields an empty result; a failed later page
/// contributes nothing. Summaries repeated across pages keep their first
/// occurrence.
pub async fn enumerate(
    source: &dyn SearchSource,
    concurrency: usize,
    max_pages: u32,
) -> Vec<ListingSummary> {
    let first = match source.fetch_page(1).await {
        Ok(page) => page,
        Err(error) => {
            log::warn!("{}: first search page failed: {error}", source.name());
            return Vec::new();
        }
    };

    let declared = first.total_pages.unwrap_or(1).max(1);
    let total_pages = declared.min(max_pages.max(1));
    if total_pages < declared {
        log::warn!(
            "{}: source declares {declared} pages, reading only {total_pages}",
            source.name()
        );
    }
    log::info!(
        "{}: {} listings on page 1 of {total_pages}",
        source.name(),
        first.summaries.len()
    );

    let mut summaries = first.summaries;
    if total_pages > 1 {
        let outcomes = run_bounded(
            (2..=total_pages).collect::<Vec<u32>>(),
            concurrency,
            Order::Submission,
            |page| source.fetch_page(page),
        )
        .await;

        let stage = format!("{} search pages", source.name());
        for page in keep_successes(&stage, outcomes) {
            summaries.extend(page.summaries);
        }
    }

    let summaries = dedup_by_id(summaries);
    log::info!("{}: enumerated {} listings", source.name(), summaries.len());
    summaries
}

fn dedup_by_id(summaries: Vec<ListingSummary>) -> Vec<ListingSummary> {
    let before = summaries.len();
    let mut seen = HashSet::new();
    let deduped: Vec<_> = summaries
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect();

    if deduped.len() < before {
        log::info!(
            "Dropped {} listings repeated across pages",
            before - deduped.len()
        );
    }
    deduped
}
