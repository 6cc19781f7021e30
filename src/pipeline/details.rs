// src/pipeline/details.rs

//! Detail fetching over a bounded pool.

use std::collections::HashSet;

use crate::models::{ListingDetail, ListingId};
use crate::services::DetailSource;

use super::pool::{Order, keep_successes, run_bounded};

/// Fetch one detail per id. Ids whose fetch fails are dropped, so the
/// result covers a subset of `ids`, in completion order.
pub async fn fetch_details(
    source: &dyn DetailSource,
    ids: &[ListingId],
    concurrency: usize,
) -> Vec<ListingDetail> {
    let mut seen = HashSet::new();
    let unique: Vec<ListingId> = ids
        .iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect();

    log::info!("{}: fetching {} listings", source.name(), unique.len());

    let outcomes = run_bounded(unique, concurrency, Order::Completion, |id| async move {
        let result = source.fetch_detail(&id).await;
        result.map(|mut detail| {
            detail.id = id;
            detail
        })
    })
    .await;

    let details = keep_successes(source.name(), outcomes);
    log::info!("{}: {} details resolved", source.name(), details.len());
    details
}
