//! CSV encoding of listing tables.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::ListingTable;

/// Render one cell: null is empty, strings verbatim, the rest as JSON text.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encode a table as CSV with a header row.
pub fn encode_table(table: &ListingTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for record in &table.records {
        writer.write_record(table.row(record).iter().map(cell))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))
}

/// Read one named column from CSV bytes. Short rows yield empty cells.
pub fn read_column(bytes: &[u8], column: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let position = reader
        .headers()?
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| AppError::validation(format!("CSV has no '{column}' column")))?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        values.push(record.get(position).unwrap_or_default().to_string());
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{ListingId, ListingRecord};

    fn sample_table() -> ListingTable {
        let mut table = ListingTable::new("listingTitle");
        table.columns.extend([
            "listingPrice".to_string(),
            "description".to_string(),
            "Elevador".to_string(),
        ]);
        table.records.push(ListingRecord {
            id: ListingId::new("A"),
            fields: [
                ("listingPrice".to_string(), json!(250000)),
                ("description".to_string(), json!("T2, com varanda")),
            ]
            .into_iter()
            .collect(),
        });
        table.records.push(ListingRecord {
            id: ListingId::new("B"),
            fields: [
                ("listingPrice".to_string(), Value::Null),
                ("Elevador".to_string(), json!("Sim")),
            ]
            .into_iter()
            .collect(),
        });
        table
    }

    #[test]
    fn test_encode_table_header_and_nulls() {
        let bytes = encode_table(&sample_table()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "listingTitle,listingPrice,description,Elevador");
        assert_eq!(lines[1], "A,250000,\"T2, com varanda\",");
        assert_eq!(lines[2], "B,,,Sim");
    }

    #[test]
    fn test_read_column() {
        let bytes = encode_table(&sample_table()).unwrap();
        let descriptions = read_column(&bytes, "description").unwrap();
        assert_eq!(descriptions, vec!["T2, com varanda", ""]);
    }

    #[test]
    fn test_read_missing_column() {
        let bytes = encode_table(&sample_table()).unwrap();
        assert!(matches!(
            read_column(&bytes, "Description"),
            Err(AppError::Validation(_))
        ));
    }
}
