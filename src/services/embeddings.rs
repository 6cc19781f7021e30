// src/services/embeddings.rs

//! Embedding back-ends for the description vector index.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{EmbeddingBackend, EmbeddingConfig};
use crate::utils::http::send_json;

/// Turns texts into vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Build the back-end selected by `backend`.
pub fn create_embedder(
    config: &EmbeddingConfig,
    backend: EmbeddingBackend,
    client: Client,
) -> Result<Box<dyn Embedder>> {
    match backend {
        EmbeddingBackend::Openai => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                AppError::config(format!("{} is not set", config.api_key_env))
            })?;
            Ok(Box::new(OpenAiEmbedder::new(client, config, api_key)))
        }
        EmbeddingBackend::BertMultilingual => Ok(Box::new(BertEmbedder::new(client, config))),
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(client: Client, config: &EmbeddingConfig, api_key: String) -> Self {
        Self {
            client,
            base_url: config.openai_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
            api_key,
            batch_size: config.batch_size.max(1),
        }
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&OpenAiRequest {
                model: &self.model,
                input: batch,
            });

        let response: OpenAiResponse = send_json(request).await?;
        let mut data = response.data;
        if data.len() != batch.len() {
            return Err(AppError::embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch).await?);
            log::debug!("Embedded {}/{} texts", vectors.len(), texts.len());
        }
        Ok(vectors)
    }
}

#[derive(Debug, Serialize)]
struct TeiRequest<'a> {
    inputs: &'a [String],
    truncate: bool,
}

/// `bert-base-multilingual-cased` served by a text-embeddings-inference
/// server (mean pooling, 512-token truncation done server side).
pub struct BertEmbedder {
    client: Client,
    base_url: String,
    batch_size: usize,
}

impl BertEmbedder {
    pub fn new(client: Client, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            base_url: config.bert_url.trim_end_matches('/').to_string(),
            batch_size: config.batch_size.max(1),
        }
    }
}

#[async_trait]
impl Embedder for BertEmbedder {
    fn name(&self) -> &str {
        "bert_multilingual"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let request = self
                .client
                .post(format!("{}/embed", self.base_url))
                .json(&TeiRequest {
                    inputs: batch,
                    truncate: true,
                });
            let embedded: Vec<Vec<f32>> = send_json(request).await?;
            if embedded.len() != batch.len() {
                return Err(AppError::embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}
