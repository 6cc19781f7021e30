//! Flat vector index over listing descriptions.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Dense vectors of a single dimension, searched by cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    pub dimension: usize,
    pub vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().position(|v| v.len() != dimension) {
            return Err(AppError::embedding(format!(
                "vector {bad} has {} dimensions, expected {dimension}",
                vectors[bad].len()
            )));
        }
        Ok(Self { dimension, vectors })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Top `k` positions by cosine similarity, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if !self.is_empty() && query.len() != self.dimension {
            return Err(AppError::embedding(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Row id and text behind one indexed vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionMeta {
    /// Row position in the source CSV.
    pub id: usize,
    pub description: String,
}
