// src/services/era.rs

//! ERA Portugal sources.
//!
//! Both endpoints reject requests without the session cookies and the
//! verification token captured from a browser session.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};

use super::{DetailSource, SearchSource};
use crate::error::{AppError, Result};
use crate::models::{
    Credentials, EraConfig, ListingDetail, ListingId, ListingSummary, SearchPage, scalar,
};
use crate::utils::http::send_json;

/// Identifier column of ERA tables.
pub const ID_COLUMN: &str = "Reference";

/// Build the header set every ERA request carries.
fn auth_headers(config: &EraConfig, credentials: &Credentials) -> Result<HeaderMap> {
    let pairs = [
        ("cookie", credentials.cookie_header()),
        ("origin", config.origin.clone()),
        ("referer", config.referer.clone()),
        (
            "requestverificationtoken",
            credentials.requestverificationtoken.clone(),
        ),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(&value)
            .map_err(|e| AppError::credentials(format!("invalid {name} header: {e}")))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

/// Shared request plumbing for the two ERA endpoints.
struct EraSession {
    client: Client,
    config: Arc<EraConfig>,
    headers: HeaderMap,
}

impl EraSession {
    fn new(client: Client, config: Arc<EraConfig>, credentials: &Credentials) -> Result<Self> {
        let headers = auth_headers(&config, credentials)?;
        Ok(Self {
            client,
            config,
            headers,
        })
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url).headers(self.headers.clone())
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url).headers(self.headers.clone())
    }
}

/// Polygon search.
pub struct EraSearch {
    session: EraSession,
}

impl EraSearch {
    pub fn new(client: Client, config: Arc<EraConfig>, credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            session: EraSession::new(client, config, credentials)?,
        })
    }

    fn payload(&self, page: u32) -> Value {
        let config = &self.session.config;
        json!({
            "businessTypeId": config.business_type_ids,
            "propertiesTypeId": config.property_type_ids,
            "locationId": [],
            "shape": config.shape,
            "validatePropertyReference": null,
            "sellPrice": null,
            "rentPrice": null,
            "subleasePrice": null,
            "netArea": null,
            "landArea": null,
            "rooms": null,
            "wcs": null,
            "parking": null,
            "onlyDevelopments": false,
            "page": page,
        })
    }
}

#[async_trait]
impl SearchSource for EraSearch {
    fn name(&self) -> &str {
        "era"
    }

    fn id_column(&self) -> &str {
        ID_COLUMN
    }

    async fn fetch_page(&self, page: u32) -> Result<SearchPage> {
        let request = self
            .session
            .post(&self.session.config.search_url)
            .json(&self.payload(page));
        let body: Value = send_json(request).await?;
        Ok(parse_search(&body))
    }
}

/// A body without `PropertyList` is read as an empty page.
fn parse_search(body: &Value) -> SearchPage {
    let total_pages = body
        .get("TotalPages")
        .and_then(Value::as_u64)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX));

    let summaries = body
        .get("PropertyList")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(parse_summary).collect())
        .unwrap_or_default();

    SearchPage {
        total_pages,
        summaries,
    }
}

/// Every scalar field of a search entry becomes a summary column.
fn parse_summary(entry: &Value) -> Option<ListingSummary> {
    let object = entry.as_object()?;
    let id = ListingId::from_json(object.get(ID_COLUMN)?)?;
    let mut summary = ListingSummary::new(id);

    for (key, value) in object {
        if key != ID_COLUMN && !value.is_object() && !value.is_array() {
            summary.fields.insert(key.clone(), value.clone());
        }
    }
    Some(summary)
}

/// `PropertyDetailByReference` JSON lookup.
pub struct EraDetails {
    session: EraSession,
}

impl EraDetails {
    pub fn new(client: Client, config: Arc<EraConfig>, credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            session: EraSession::new(client, config, credentials)?,
        })
    }
}

#[async_trait]
impl DetailSource for EraDetails {
    fn name(&self) -> &str {
        "era details"
    }

    async fn fetch_detail(&self, id: &ListingId) -> Result<ListingDetail> {
        let request = self
            .session
            .get(&self.session.config.detail_url)
            .query(&[("reference", id.as_str())]);
        let body: Value = send_json(request).await?;
        parse_detail(id, &body)
            .ok_or_else(|| AppError::validation(format!("empty detail payload for {id}")))
    }
}

fn parse_detail(id: &ListingId, body: &Value) -> Option<ListingDetail> {
    let object = body.as_object().filter(|o| !o.is_empty())?;
    let location = object.get("LocalizationDetail");
    let nested = |parent: Option<&Value>, key: &str| scalar(parent.and_then(|p| p.get(key)));

    let detail = ListingDetail::new(id.clone())
        .with_field("Description", scalar(object.get("Description")))
        .with_field("Price", nested(object.get("SellPrice"), "Value"))
        .with_field("Rooms", scalar(object.get("Rooms")))
        .with_field("Wcs", scalar(object.get("Wcs")))
        .with_field("Latitude", scalar(object.get("Lat")))
        .with_field("Longitude", scalar(object.get("Lng")))
        .with_field("District", nested(location, "District"))
        .with_field("County", nested(location, "County"))
        .with_field("Parish", nested(location, "Parish"))
        .with_field("Zone", nested(location, "Zone"));
    Some(detail)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::HttpConfig;
    use crate::utils::http::create_client;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            cookies: BTreeMap::from([("session".to_string(), "s1".to_string())]),
            requestverificationtoken: "tok".to_string(),
        }
    }

    fn config_for(server: &MockServer) -> Arc<EraConfig> {
        Arc::new(EraConfig {
            search_url: format!("{}/Property/Search", server.uri()),
            detail_url: format!("{}/Property/PropertyDetailByReference", server.uri()),
            ..EraConfig::default()
        })
    }

    #[test]
    fn test_parse_search_reads_references() {
        let body = json!({
            "TotalPages": 3,
            "PropertyList": [
                { "Reference": "ERA-1", "Rooms": 2, "Photos": ["a.jpg"] },
                { "Reference": 42 },
                { "Title": "no reference" }
            ]
        });
        let page = parse_search(&body);
        assert_eq!(page.total_pages, Some(3));
        assert_eq!(page.summaries.len(), 2);
        assert_eq!(page.summaries[0].id, ListingId::new("ERA-1"));
        assert_eq!(page.summaries[0].fields["Rooms"], json!(2));
        assert!(!page.summaries[0].fields.contains_key("Photos"));
        assert_eq!(page.summaries[1].id, ListingId::new("42"));
    }

    #[test]
    fn test_parse_search_missing_list_is_empty() {
        let page = parse_search(&json!({}));
        assert_eq!(page.total_pages, None);
        assert!(page.summaries.is_empty());
    }

    #[test]
    fn test_parse_detail_degrades_missing_nested() {
        let id = ListingId::new("ERA-1");
        let body = json!({
            "Description": "Moradia com jardim",
            "SellPrice": { "Value": 320000 },
            "Rooms": 4,
            "Lat": 41.15,
            "Lng": -8.61,
            "LocalizationDetail": { "District": "Porto", "County": "Porto" }
        });
        let detail = parse_detail(&id, &body).unwrap();
        assert_eq!(detail.fields["Price"], json!(320000));
        assert_eq!(detail.fields["District"], json!("Porto"));
        assert_eq!(detail.fields["Parish"], Value::Null);
        assert_eq!(detail.fields["Wcs"], Value::Null);

        let bare = parse_detail(&id, &json!({"Description": "x", "SellPrice": null})).unwrap();
        assert_eq!(bare.fields["Price"], Value::Null);
        assert_eq!(bare.fields["Zone"], Value::Null);
    }

    #[test]
    fn test_parse_detail_rejects_empty_payload() {
        let id = ListingId::new("ERA-1");
        assert!(parse_detail(&id, &Value::Null).is_none());
        assert!(parse_detail(&id, &json!({})).is_none());
    }

    #[test]
    fn test_auth_headers_rejects_control_characters() {
        let mut bad = credentials();
        bad.requestverificationtoken = "tok\n".to_string();
        assert!(auth_headers(&EraConfig::default(), &bad).is_err());
    }

    #[tokio::test]
    async fn test_search_sends_credentials_and_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Property/Search"))
            .and(header("cookie", "session=s1"))
            .and(header("requestverificationtoken", "tok"))
            .and(body_partial_json(json!({ "page": 2, "onlyDevelopments": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "TotalPages": 2,
                "PropertyList": [{ "Reference": "ERA-9" }]
            })))
            .mount(&server)
            .await;

        let client = create_client(&HttpConfig::default()).unwrap();
        let search = EraSearch::new(client, config_for(&server), &credentials()).unwrap();
        let page = search.fetch_page(2).await.unwrap();
        assert_eq!(page.summaries[0].id, ListingId::new("ERA-9"));
    }

    #[tokio::test]
    async fn test_detail_fetch_by_reference() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Property/PropertyDetailByReference"))
            .and(query_param("reference", "ERA-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Description": "T1 no centro",
                "Wcs": 1
            })))
            .mount(&server)
            .await;

        let client = create_client(&HttpConfig::default()).unwrap();
        let details = EraDetails::new(client, config_for(&server), &credentials()).unwrap();

        let detail = details.fetch_detail(&ListingId::new("ERA-9")).await.unwrap();
        assert_eq!(detail.fields["Description"], json!("T1 no centro"));

        // Unmatched reference answers 404.
        assert!(details.fetch_detail(&ListingId::new("ERA-0")).await.is_err());
    }
}
