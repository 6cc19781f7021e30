//! Storage for gathered listing tables and the description index.
//!
//! ## Directory Structure
//!
//! ```text
//! gathered_data/
//! ├── remax_lisboa_18_10_2026.csv     # one table per run
//! ├── remax_all_18_10_2026.csv
//! └── era_shape_18_10_2026.csv
//!
//! index_dir/
//! ├── house_descriptions_index.json   # vectors
//! └── metadata.json                   # row id + description per vector
//! ```

pub mod local;
pub mod table;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::ListingTable;

pub use local::LocalStorage;

/// Vector index file written by the embedding job.
pub const INDEX_FILE: &str = "house_descriptions_index.json";
/// Description metadata aligned with [`INDEX_FILE`].
pub const METADATA_FILE: &str = "metadata.json";

/// Metadata about a table write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub timestamp: DateTime<Utc>,
}

/// Destination for joined listing tables.
#[async_trait]
pub trait ListingSink: Send + Sync {
    /// Persist `table` under `name`, replacing any previous file of that name.
    async fn write_table(&self, name: &str, table: &ListingTable) -> Result<WriteMetadata>;
}

/// `{source}_{scope}_{dd_mm_YYYY}.csv`, lowercased with spaces as `_`.
pub fn output_file_name(source: &str, scope: &str, date: NaiveDate) -> String {
    let name = format!("{source}_{scope}_{}", date.format("%d_%m_%Y"));
    format!("{}.csv", name.to_lowercase().replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(
            output_file_name("remax", "Lisboa", date),
            "remax_lisboa_18_10_2026.csv"
        );
        assert_eq!(
            output_file_name("remax", "Vila Real", date),
            "remax_vila_real_18_10_2026.csv"
        );
    }
}
