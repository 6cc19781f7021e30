// src/pipeline/scrape.rs

//! Per-site scrape runs: enumerate, fetch details, join, write.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use reqwest::Client;

use crate::error::Result;
use crate::models::{Config, ListingId, ListingSummary, ListingTable};
use crate::services::{
    CredentialProvider, EraDetails, EraSearch, REMAX_ID_COLUMN, RemaxDetails, RemaxListingType,
    RemaxSearch, SearchSource,
};
use crate::storage::{ListingSink, WriteMetadata, output_file_name};
use crate::utils::report;

use super::{enumerate, fetch_details, join};

fn ids_of(summaries: &[ListingSummary]) -> Vec<ListingId> {
    summaries.iter().map(|s| s.id.clone()).collect()
}

/// Scrape one RE/MAX city search, capped at `max_results` listings.
pub async fn run_remax(
    config: &Config,
    client: &Client,
    city: &str,
    max_results: u32,
) -> Result<ListingTable> {
    let remax = Arc::new(config.remax.clone());
    let concurrency = config.http.max_concurrent;

    let search = RemaxSearch::new(client.clone(), Arc::clone(&remax), city, max_results)?;
    let listing_types = RemaxListingType::new(client.clone(), Arc::clone(&remax))?;
    let details = RemaxDetails::new(client.clone(), remax)?;

    log::info!("RE/MAX {city}: enumerating up to {max_results} listings");
    let summaries = enumerate(&search, concurrency, config.http.max_pages).await;
    let ids = ids_of(&summaries);

    let types = fetch_details(&listing_types, &ids, concurrency).await;
    let descriptions = fetch_details(&details, &ids, concurrency).await;

    let table = join(search.id_column(), summaries, &[types, descriptions]);
    log::info!("RE/MAX {city}: {} rows", table.len());
    Ok(table)
}

/// Scrape every configured city, one after another, into a single table.
pub async fn run_remax_all(config: &Config, client: &Client) -> Result<ListingTable> {
    let cities = &config.remax.cities;
    let mut tables = Vec::with_capacity(cities.len());

    for (i, city) in cities.iter().enumerate() {
        report::step(i + 1, cities.len(), &format!("RE/MAX {city}"));
        tables.push(run_remax(config, client, city, config.remax.max_results).await?);
    }

    Ok(ListingTable::concat(REMAX_ID_COLUMN, tables))
}

/// Scrape the ERA polygon search. Credentials are loaded before any request.
pub async fn run_era(
    config: &Config,
    client: &Client,
    credentials: &dyn CredentialProvider,
) -> Result<ListingTable> {
    let credentials = credentials.fetch_credentials()?;
    let era = Arc::new(config.era.clone());
    let concurrency = config.http.max_concurrent;

    let search = EraSearch::new(client.clone(), Arc::clone(&era), &credentials)?;
    let details = EraDetails::new(client.clone(), era, &credentials)?;

    let summaries = enumerate(&search, concurrency, config.http.max_pages).await;
    let ids = ids_of(&summaries);
    let fetched = fetch_details(&details, &ids, concurrency).await;

    let table = join(search.id_column(), summaries, &[fetched]);
    log::info!("ERA: {} rows", table.len());
    Ok(table)
}

/// Outcome of a full run.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub remax: WriteMetadata,
    pub era: WriteMetadata,
}

/// Run all RE/MAX cities, then ERA, writing one CSV per site.
pub async fn run_pipeline(
    config: &Config,
    client: &Client,
    credentials: &dyn CredentialProvider,
    sink: &dyn ListingSink,
    date: NaiveDate,
) -> Result<PipelineSummary> {
    let start_time = Utc::now();
    report::header("Listing pipeline starting");

    report::step(1, 2, "RE/MAX - all cities");
    let remax_table = run_remax_all(config, client).await?;
    let remax = sink
        .write_table(&output_file_name("remax", "all", date), &remax_table)
        .await?;

    report::step(2, 2, "ERA - polygon search");
    let era_table = run_era(config, client, credentials).await?;
    let era = sink
        .write_table(&output_file_name("era", "shape", date), &era_table)
        .await?;

    let elapsed = Utc::now() - start_time;
    report::summary(
        "Listing pipeline complete",
        &[
            ("RE/MAX rows", remax.rows.to_string()),
            ("RE/MAX file", remax.path.display().to_string()),
            ("ERA rows", era.rows.to_string()),
            ("ERA file", era.path.display().to_string()),
            ("Elapsed", format!("{}s", elapsed.num_seconds())),
        ],
    );

    Ok(PipelineSummary { remax, era })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;
    use crate::services::FileCredentials;

    #[tokio::test]
    async fn test_era_without_credentials_fails_before_network() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        // Unroutable: any request would fail with an Http error, not Credentials.
        config.era.search_url = "http://127.0.0.1:1/search".to_string();

        let provider = FileCredentials::new(tmp.path().join("missing.json"));
        let client = Client::new();

        let result = run_era(&config, &client, &provider).await;
        assert!(matches!(result, Err(AppError::Credentials(_))));
    }

    #[tokio::test]
    async fn test_remax_all_without_cities_is_empty() {
        let mut config = Config::default();
        config.remax.cities.clear();

        let table = run_remax_all(&config, &Client::new()).await.unwrap();
        assert!(table.is_empty());
        assert_eq!(table.id_column, "listingTitle");
    }
}
