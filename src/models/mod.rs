// src/models/mod.rs

//! Domain models for the scrapers and the vector job.

mod config;
mod credentials;
mod listing;
mod vector;

// Re-export all public types
pub use config::{
    Config, EmbeddingBackend, EmbeddingConfig, EraConfig, GeoPoint, HttpConfig, OutputConfig,
    RemaxConfig,
};
pub use credentials::Credentials;
pub use listing::{
    Fields, ListingDetail, ListingId, ListingRecord, ListingSummary, ListingTable, SearchPage,
    scalar,
};
pub use vector::{DescriptionMeta, VectorIndex};
