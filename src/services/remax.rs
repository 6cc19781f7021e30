// src/services/remax.rs

//! RE/MAX Portugal sources.
//!
//! Search goes through the `MultiMatchSearch` query API; per-listing data
//! comes from two static HTML fragments keyed by the listing title.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{Value, json};
use url::Url;

use super::{DetailSource, SearchSource};
use crate::error::{AppError, Result};
use crate::models::{ListingDetail, ListingId, ListingSummary, RemaxConfig, SearchPage, scalar};
use crate::utils::http::{send_json, send_text};
use crate::utils::{normalize_whitespace, push_segment};

/// Identifier column of RE/MAX tables.
pub const ID_COLUMN: &str = "listingTitle";

const SUMMARY_KEYS: [&str; 5] = [
    "listingPrice",
    "listingTypeID",
    "regionName1",
    "regionName2",
    "regionName3",
];

const NO_DESCRIPTION: &str = "No description";
const NO_ENERGY_RATING: &str = "Not available";

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Referer the site itself sends for a city search.
fn city_referer(origin: &str, city: &str) -> Result<String> {
    let state = json!({
        "regionName": city,
        "businessType": 1,
        "page": 1,
        "regionID": "",
        "regionType": "",
        "sort": { "fieldToSort": "PublishDate", "order": 1 },
        "mapIsOpen": false,
    });
    let mut url = Url::parse(origin)?.join("comprar")?;
    url.query_pairs_mut()
        .append_pair("searchQueryState", &state.to_string());
    Ok(url.into())
}

/// Residential listings for sale, newest first.
fn search_payload() -> Value {
    json!({
        "filters": [
            { "field": "BusinessTypeID", "value": "1", "type": 0 },
            { "field": "IsSpecialExclusive", "value": "false", "type": 0 },
        ],
        "sort": { "fieldToSort": "PublishDate", "order": 1 },
    })
}

/// Free-text city search.
pub struct RemaxSearch {
    client: Client,
    config: Arc<RemaxConfig>,
    city: String,
    max_results: u32,
    referer: String,
}

impl RemaxSearch {
    pub fn new(
        client: Client,
        config: Arc<RemaxConfig>,
        city: impl Into<String>,
        max_results: u32,
    ) -> Result<Self> {
        let city = city.into();
        let referer = city_referer(&config.origin, &city)?;
        Ok(Self {
            client,
            config,
            city,
            max_results: max_results.max(1),
            referer,
        })
    }

    fn page_size(&self) -> u32 {
        self.config.page_size.min(self.max_results).max(1)
    }

    /// Pages needed to read `min(total, max_results)` listings.
    fn total_pages(&self, total: u64) -> u32 {
        let wanted = total.min(u64::from(self.max_results));
        let pages = wanted.div_ceil(u64::from(self.page_size()));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }
}

#[async_trait]
impl SearchSource for RemaxSearch {
    fn name(&self) -> &str {
        "remax"
    }

    fn id_column(&self) -> &str {
        ID_COLUMN
    }

    async fn fetch_page(&self, page: u32) -> Result<SearchPage> {
        let size = self.page_size();
        let api_page = page.saturating_sub(1).to_string();
        let size_param = size.to_string();

        let request = self
            .client
            .post(&self.config.search_url)
            .query(&[
                ("page", api_page.as_str()),
                ("searchValue", self.city.as_str()),
                ("size", size_param.as_str()),
            ])
            .header("origin", &self.config.origin)
            .header("referer", &self.referer)
            .json(&search_payload());

        let body: Value = send_json(request).await?;
        let (total, mut summaries) = parse_search(&body)?;

        // The last page may overshoot the requested maximum.
        let already = u64::from(page.saturating_sub(1)) * u64::from(size);
        let remaining = u64::from(self.max_results).saturating_sub(already);
        summaries.truncate(usize::try_from(remaining).unwrap_or(usize::MAX));

        Ok(SearchPage {
            total_pages: total.map(|t| self.total_pages(t)),
            summaries,
        })
    }
}

/// Split a search response into the declared total and the summaries.
fn parse_search(body: &Value) -> Result<(Option<u64>, Vec<ListingSummary>)> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::validation("search response has no results array"))?;
    let total = body.get("total").and_then(Value::as_u64);

    let summaries = results
        .iter()
        .filter_map(|entry| {
            let summary = parse_summary(entry);
            if summary.is_none() {
                log::debug!("Skipping search entry without {ID_COLUMN}");
            }
            summary
        })
        .collect();

    Ok((total, summaries))
}

fn parse_summary(entry: &Value) -> Option<ListingSummary> {
    let id = ListingId::from_json(entry.get(ID_COLUMN)?)?;
    let mut summary = ListingSummary::new(id);

    for key in SUMMARY_KEYS {
        summary.fields.insert(key.to_string(), scalar(entry.get(key)));
    }

    let coordinates = entry.get("coordinates");
    for (column, key) in [("latitude", "latitude"), ("longitude", "longitude")] {
        summary.fields.insert(
            column.to_string(),
            scalar(coordinates.and_then(|c| c.get(key))),
        );
    }

    Some(summary)
}

/// `searchdetails_V2` fragment: the human-readable listing type.
pub struct RemaxListingType {
    client: Client,
    config: Arc<RemaxConfig>,
    selector: Selector,
}

impl RemaxListingType {
    pub fn new(client: Client, config: Arc<RemaxConfig>) -> Result<Self> {
        Ok(Self {
            client,
            config,
            selector: parse_selector("li.listing-type")?,
        })
    }
}

#[async_trait]
impl DetailSource for RemaxListingType {
    fn name(&self) -> &str {
        "remax listing type"
    }

    async fn fetch_detail(&self, id: &ListingId) -> Result<ListingDetail> {
        let url = push_segment(&self.config.search_details_url, &format!("{id}.html"))?;
        let request = self
            .client
            .get(url)
            .header("origin", &self.config.origin);
        let html = send_text(request).await?;
        Ok(parse_listing_type(&html, id, &self.selector))
    }
}

fn parse_listing_type(html: &str, id: &ListingId, selector: &Selector) -> ListingDetail {
    let document = Html::parse_document(html);
    let listing_type = document
        .select(selector)
        .next()
        .map(|el| Value::String(el.text().collect::<String>().trim().to_string()))
        .unwrap_or(Value::Null);

    ListingDetail::new(id.clone()).with_field("listing_type", listing_type)
}

struct DetailSelectors {
    description: Selector,
    row: Selector,
    cell: Selector,
    energy: Selector,
}

impl DetailSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            description: parse_selector("div.listing-description")?,
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
            energy: parse_selector("div.energy-details img[alt]")?,
        })
    }
}

/// `details-mobile_V2` fragment: description, attribute table, energy rating.
pub struct RemaxDetails {
    client: Client,
    config: Arc<RemaxConfig>,
    selectors: DetailSelectors,
    whitelist: HashSet<String>,
}

impl RemaxDetails {
    pub fn new(client: Client, config: Arc<RemaxConfig>) -> Result<Self> {
        let whitelist = config.attribute_whitelist.iter().cloned().collect();
        Ok(Self {
            client,
            config,
            selectors: DetailSelectors::new()?,
            whitelist,
        })
    }
}

#[async_trait]
impl DetailSource for RemaxDetails {
    fn name(&self) -> &str {
        "remax details"
    }

    async fn fetch_detail(&self, id: &ListingId) -> Result<ListingDetail> {
        let url = push_segment(&self.config.details_url, &format!("{id}.html"))?;
        let request = self
            .client
            .get(url)
            .header("origin", &self.config.origin);
        let html = send_text(request).await?;
        Ok(parse_details(&html, id, &self.selectors, &self.whitelist))
    }
}

fn parse_details(
    html: &str,
    id: &ListingId,
    selectors: &DetailSelectors,
    whitelist: &HashSet<String>,
) -> ListingDetail {
    let document = Html::parse_document(html);

    let description = document
        .select(&selectors.description)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let energy_efficiency = document
        .select(&selectors.energy)
        .next()
        .and_then(|img| img.value().attr("alt"))
        .unwrap_or(NO_ENERGY_RATING)
        .to_string();

    let mut detail = ListingDetail::new(id.clone())
        .with_field("description", Value::String(description))
        .with_field("energy_efficiency", Value::String(energy_efficiency));

    for row in document.select(&selectors.row) {
        let cells: Vec<String> = row
            .select(&selectors.cell)
            .map(|td| normalize_whitespace(&td.text().collect::<String>()))
            .collect();

        // Rows with an odd cell count are not key/value rows.
        if cells.len() % 2 != 0 {
            continue;
        }
        for pair in cells.chunks(2) {
            if whitelist.contains(&pair[0]) {
                detail.attributes.insert(pair[0].clone(), pair[1].clone());
            }
        }
    }

    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpConfig;
    use crate::utils::http::create_client;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DETAIL_HTML: &str = r#"
        <html><body>
          <div class="listing-description">
             Apartamento T2 renovado perto do metro.
          </div>
          <table>
            <tr><td>Área Útil m2</td><td> 85 </td><td>Quartos</td><td>2</td></tr>
            <tr><td>Piso</td><td>3</td><td>orphan</td></tr>
            <tr><td>Referência</td><td>122371001-15</td></tr>
            <tr><td>Elevador</td><td>Sim</td></tr>
          </table>
          <div class="energy-details"><img src="b.png" alt="B"></div>
        </body></html>
    "#;

    fn whitelist() -> HashSet<String> {
        RemaxConfig::default()
            .attribute_whitelist
            .into_iter()
            .collect()
    }

    fn search(config: RemaxConfig, max_results: u32) -> RemaxSearch {
        let client = create_client(&HttpConfig::default()).unwrap();
        RemaxSearch::new(client, Arc::new(config), "Lisboa", max_results).unwrap()
    }

    #[test]
    fn test_parse_details_keeps_whitelisted_pairs() {
        let id = ListingId::new("122371001-15");
        let detail = parse_details(DETAIL_HTML, &id, &DetailSelectors::new().unwrap(), &whitelist());

        assert_eq!(
            detail.fields["description"],
            json!("Apartamento T2 renovado perto do metro.")
        );
        assert_eq!(detail.fields["energy_efficiency"], json!("B"));
        assert_eq!(detail.attributes["Área Útil m2"], "85");
        assert_eq!(detail.attributes["Quartos"], "2");
        assert_eq!(detail.attributes["Elevador"], "Sim");
        // Odd row skipped, non-whitelisted key dropped.
        assert!(!detail.attributes.contains_key("Piso"));
        assert!(!detail.attributes.contains_key("Referência"));
    }

    #[test]
    fn test_parse_details_fallbacks() {
        let id = ListingId::new("x");
        let detail = parse_details(
            "<html><body><p>nothing</p></body></html>",
            &id,
            &DetailSelectors::new().unwrap(),
            &whitelist(),
        );
        assert_eq!(detail.fields["description"], json!(NO_DESCRIPTION));
        assert_eq!(detail.fields["energy_efficiency"], json!(NO_ENERGY_RATING));
        assert!(detail.attributes.is_empty());
    }

    #[test]
    fn test_parse_listing_type() {
        let selector = parse_selector("li.listing-type").unwrap();
        let id = ListingId::new("x");

        let found = parse_listing_type(
            r#"<ul><li class="listing-type"> Moradia </li></ul>"#,
            &id,
            &selector,
        );
        assert_eq!(found.fields["listing_type"], json!("Moradia"));

        let missing = parse_listing_type("<ul></ul>", &id, &selector);
        assert_eq!(missing.fields["listing_type"], Value::Null);
    }

    #[test]
    fn test_parse_search_extracts_summaries() {
        let body = json!({
            "total": 2,
            "results": [
                {
                    "listingTitle": "122371001-15",
                    "listingPrice": 250000,
                    "listingTypeID": 1,
                    "regionName1": "Lisboa",
                    "regionName2": "Lisboa",
                    "regionName3": "Arroios",
                    "coordinates": { "latitude": 38.72, "longitude": -9.13 }
                },
                { "listingTitle": "122371001-16", "coordinates": null },
                { "listingPrice": 1 }
            ]
        });

        let (total, summaries) = parse_search(&body).unwrap();
        assert_eq!(total, Some(2));
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].fields["latitude"], json!(38.72));
        assert_eq!(summaries[0].fields["regionName3"], json!("Arroios"));
        assert_eq!(summaries[1].fields["latitude"], Value::Null);
        assert_eq!(summaries[1].fields["listingPrice"], Value::Null);
    }

    #[test]
    fn test_parse_search_without_results_is_error() {
        assert!(parse_search(&json!({"message": "error"})).is_err());
    }

    #[test]
    fn test_total_pages_respects_max_results() {
        let config = RemaxConfig {
            page_size: 100,
            ..RemaxConfig::default()
        };
        let capped = search(config.clone(), 250);
        assert_eq!(capped.total_pages(10_000), 3);
        assert_eq!(capped.total_pages(120), 2);
        assert_eq!(capped.total_pages(0), 1);

        let small = search(config, 40);
        assert_eq!(small.page_size(), 40);
        assert_eq!(small.total_pages(1_000), 1);
    }

    #[test]
    fn test_city_referer_encodes_state() {
        let referer = city_referer("https://remax.pt", "Castelo Branco").unwrap();
        assert!(referer.starts_with("https://remax.pt/comprar?searchQueryState="));
        assert!(referer.contains("Castelo+Branco"));
    }

    #[tokio::test]
    async fn test_fetch_page_sends_zero_based_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Api/Listing/MultiMatchSearch"))
            .and(query_param("page", "1"))
            .and(query_param("searchValue", "Lisboa"))
            .and(query_param("size", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 5,
                "results": [
                    { "listingTitle": "C" },
                    { "listingTitle": "D" },
                ]
            })))
            .mount(&server)
            .await;

        let config = RemaxConfig {
            search_url: format!("{}/Api/Listing/MultiMatchSearch", server.uri()),
            page_size: 2,
            ..RemaxConfig::default()
        };
        let source = search(config, 3);

        let page = source.fetch_page(2).await.unwrap();
        assert_eq!(page.total_pages, Some(2));
        // Only one listing left before reaching max_results = 3.
        assert_eq!(page.summaries.len(), 1);
        assert_eq!(page.summaries[0].id, ListingId::new("C"));
    }

    #[tokio::test]
    async fn test_details_fetch_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/details-mobile_V2/122371001-15.html"))
            .and(header("origin", "https://remax.pt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_HTML))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/details-mobile_V2/missing.html"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = RemaxConfig {
            details_url: format!("{}/details-mobile_V2", server.uri()),
            ..RemaxConfig::default()
        };
        let client = create_client(&HttpConfig::default()).unwrap();
        let details = RemaxDetails::new(client, Arc::new(config)).unwrap();

        let ok = details
            .fetch_detail(&ListingId::new("122371001-15"))
            .await
            .unwrap();
        assert_eq!(ok.attributes["Quartos"], "2");

        let err = details.fetch_detail(&ListingId::new("missing")).await;
        assert!(matches!(err, Err(AppError::Status { status: 500, .. })));
    }
}
