// src/pipeline/vectors.rs

//! Description vector index: build from a gathered CSV, query by text.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{DescriptionMeta, EmbeddingConfig, VectorIndex};
use crate::services::Embedder;
use crate::storage::{INDEX_FILE, LocalStorage, METADATA_FILE};
use crate::utils::truncate_graphemes;

/// Outcome of an index build.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSummary {
    pub rows: usize,
    pub indexed: usize,
    pub dimension: usize,
}

/// Keep non-blank descriptions, tagged with their row index and cut to
/// `max_chars` graphemes.
fn prepare(descriptions: Vec<String>, max_chars: usize) -> Vec<DescriptionMeta> {
    descriptions
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(id, text)| DescriptionMeta {
            id,
            description: truncate_graphemes(&text, max_chars).to_string(),
        })
        .collect()
}

/// Embed the description column of `data_path` and write the index and
/// its metadata into `storage`.
pub async fn run_vectors(
    config: &EmbeddingConfig,
    embedder: &dyn Embedder,
    data_path: &Path,
    column: &str,
    storage: &LocalStorage,
) -> Result<VectorSummary> {
    let descriptions = LocalStorage::read_csv_column(data_path, column).await?;
    let rows = descriptions.len();
    let metadata = prepare(descriptions, config.max_chars);
    log::info!(
        "{}: embedding {} of {rows} descriptions from {}",
        embedder.name(),
        metadata.len(),
        data_path.display()
    );

    let vectors = if metadata.is_empty() {
        Vec::new()
    } else {
        let texts: Vec<String> = metadata.iter().map(|m| m.description.clone()).collect();
        embedder.embed(&texts).await?
    };
    if vectors.len() != metadata.len() {
        return Err(AppError::embedding(format!(
            "{} returned {} vectors for {} texts",
            embedder.name(),
            vectors.len(),
            metadata.len()
        )));
    }

    let index = VectorIndex::new(vectors)?;
    storage.write_json(INDEX_FILE, &index).await?;
    storage.write_json(METADATA_FILE, &metadata).await?;
    log::info!(
        "Wrote {} vectors of dimension {} to {}",
        index.len(),
        index.dimension,
        storage.root().display()
    );

    Ok(VectorSummary {
        rows,
        indexed: index.len(),
        dimension: index.dimension,
    })
}

/// Return the `k` descriptions closest to `text`, best first.
pub async fn search_index(
    storage: &LocalStorage,
    embedder: &dyn Embedder,
    text: &str,
    k: usize,
) -> Result<Vec<(DescriptionMeta, f32)>> {
    let index: VectorIndex = storage
        .read_json(INDEX_FILE)
        .await?
        .ok_or_else(|| AppError::validation(format!("{INDEX_FILE} not found")))?;
    let metadata: Vec<DescriptionMeta> = storage
        .read_json(METADATA_FILE)
        .await?
        .ok_or_else(|| AppError::validation(format!("{METADATA_FILE} not found")))?;
    if metadata.len() != index.len() {
        return Err(AppError::validation(format!(
            "{METADATA_FILE} has {} entries, index has {}",
            metadata.len(),
            index.len()
        )));
    }
    if index.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = embedder.embed(&[text.to_string()]).await?;
    let query = query
        .pop()
        .ok_or_else(|| AppError::embedding(format!("{} returned no vector", embedder.name())))?;

    let hits = index.search(&query, k)?;
    Ok(hits
        .into_iter()
        .map(|(pos, score)| (metadata[pos].clone(), score))
        .collect())
}
