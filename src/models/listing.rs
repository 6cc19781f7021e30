//! Listing records flowing through the scrape pipeline.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque key of one listing within one source site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build an id from a JSON value. Numbers are stringified; empty strings,
    /// nulls and structured values are rejected.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flat field map of a single listing.
pub type Fields = BTreeMap<String, Value>;

/// Keep scalars, degrade anything structured (or absent) to null.
pub fn scalar(value: Option<&Value>) -> Value {
    match value {
        Some(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => v.clone(),
        _ => Value::Null,
    }
}

/// First-stage search result for one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: ListingId,
    pub fields: Fields,
}

impl ListingSummary {
    pub fn new(id: ListingId) -> Self {
        Self {
            id,
            fields: Fields::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Second-stage detail result for one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDetail {
    pub id: ListingId,
    pub fields: Fields,
    /// Free-form key/value table, expanded into one column per key on join.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ListingDetail {
    pub fn new(id: ListingId) -> Self {
        Self {
            id,
            fields: Fields::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// One page of a paginated search.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Page count declared (or inferred) by the source, if any.
    pub total_pages: Option<u32>,
    pub summaries: Vec<ListingSummary>,
}

/// Joined row written to the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub id: ListingId,
    pub fields: Fields,
}

/// Wide table of joined listings.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingTable {
    /// Name of the identifier column (always `columns[0]`).
    pub id_column: String,
    pub columns: Vec<String>,
    pub records: Vec<ListingRecord>,
}

impl ListingTable {
    /// Create an empty table keyed by `id_column`.
    pub fn new(id_column: impl Into<String>) -> Self {
        let id_column = id_column.into();
        Self {
            columns: vec![id_column.clone()],
            id_column,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the record for an id.
    pub fn get(&self, id: &ListingId) -> Option<&ListingRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Cell value for an id and column; `Null` when the column is unset.
    pub fn value(&self, id: &ListingId, column: &str) -> Option<Value> {
        let record = self.get(id)?;
        if column == self.id_column {
            return Some(Value::String(record.id.to_string()));
        }
        Some(record.fields.get(column).cloned().unwrap_or(Value::Null))
    }

    /// Cells of a record in column order.
    pub fn row(&self, record: &ListingRecord) -> Vec<Value> {
        self.columns
            .iter()
            .map(|column| {
                if *column == self.id_column {
                    Value::String(record.id.to_string())
                } else {
                    record.fields.get(column).cloned().unwrap_or(Value::Null)
                }
            })
            .collect()
    }

    /// Concatenate tables with a column union. Ids already seen are skipped.
    pub fn concat(id_column: &str, tables: impl IntoIterator<Item = ListingTable>) -> Self {
        let mut out = Self::new(id_column);
        let mut known_columns: HashSet<String> = out.columns.iter().cloned().collect();
        let mut seen = HashSet::new();
        let mut skipped = 0usize;

        for table in tables {
            for column in table.columns {
                if known_columns.insert(column.clone()) {
                    out.columns.push(column);
                }
            }
            for record in table.records {
                if seen.insert(record.id.clone()) {
                    out.records.push(record);
                } else {
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::info!("Skipped {skipped} listings already present in an earlier table");
        }
        out
    }

    /// Map from id to record position.
    pub fn positions(&self) -> HashMap<ListingId, usize> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect()
    }
}
