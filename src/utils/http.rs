// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{EmbeddingConfig, HttpConfig};

/// Create the shared asynchronous HTTP client.
///
/// The timeout applies to every request issued through the client.
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    build_client(&config.user_agent, config.timeout_secs)
}

/// Client for embedding back-ends, with the embedding timeout in place of
/// the scraper's.
pub fn create_embedding_client(http: &HttpConfig, embedding: &EmbeddingConfig) -> Result<Client> {
    build_client(&http.user_agent, embedding.timeout_secs)
}

fn build_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Send a request and return the body of a 2xx response.
pub async fn send_text(request: RequestBuilder) -> Result<String> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::status(status, response.url().as_str()));
    }
    Ok(response.text().await?)
}

/// Send a request and decode the JSON body of a 2xx response.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let text = send_text(request).await?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = create_client(&HttpConfig::default()).unwrap();
        let err = send_text(client.get(format!("{}/gone", server.uri())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn embedding_client_outlives_scrape_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([[0.5, 0.5]]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;
        let url = format!("{}/embed", server.uri());

        let http = HttpConfig {
            timeout_secs: 1,
            ..HttpConfig::default()
        };
        let embedding = EmbeddingConfig {
            timeout_secs: 10,
            ..EmbeddingConfig::default()
        };

        let scrape = create_client(&http).unwrap();
        let err = send_text(scrape.post(&url)).await.unwrap_err();
        assert!(matches!(err, AppError::Http(_)));

        let embed = create_embedding_client(&http, &embedding).unwrap();
        let vectors: Vec<Vec<f32>> = send_json(embed.post(&url)).await.unwrap();
        assert_eq!(vectors, vec![vec![0.5, 0.5]]);
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = create_client(&HttpConfig::default()).unwrap();
        let result: Result<serde_json::Value> =
            send_json(client.get(format!("{}/broken", server.uri()))).await;
        assert!(matches!(result, Err(AppError::Json(_))));
    }
}
