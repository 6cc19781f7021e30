//! Service layer: per-site sources and embedding back-ends.
//!
//! - RE/MAX search and detail fragments (`RemaxSearch`, `RemaxDetails`, `RemaxListingType`)
//! - ERA search and detail API (`EraSearch`, `EraDetails`)
//! - Credential bundle provider (`FileCredentials`)
//! - Embedding back-ends (`OpenAiEmbedder`, `BertEmbedder`)

mod credentials;
mod embeddings;
mod era;
mod remax;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ListingDetail, ListingId, SearchPage};

pub use credentials::{CredentialProvider, FileCredentials};
pub use embeddings::{BertEmbedder, Embedder, OpenAiEmbedder, create_embedder};
pub use era::{EraDetails, EraSearch, ID_COLUMN as ERA_ID_COLUMN};
pub use remax::{ID_COLUMN as REMAX_ID_COLUMN, RemaxDetails, RemaxListingType, RemaxSearch};

/// A paginated listing search.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Short name used in logs and output file names.
    fn name(&self) -> &str;

    /// Column holding the listing identifier in joined tables.
    fn id_column(&self) -> &str;

    /// Fetch one page (1-based).
    async fn fetch_page(&self, page: u32) -> Result<SearchPage>;
}

/// Per-listing detail lookup.
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Stage name used in logs.
    fn name(&self) -> &str;

    async fn fetch_detail(&self, id: &ListingId) -> Result<ListingDetail>;
}
