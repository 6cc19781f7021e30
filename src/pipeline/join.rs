// src/pipeline/join.rs

//! Left join of search summaries with detail results.

use std::collections::HashSet;

use serde_json::Value;

use crate::models::{ListingDetail, ListingRecord, ListingSummary, ListingTable};

/// Tracks column names in first-seen order.
struct Columns {
    names: Vec<String>,
    known: HashSet<String>,
}

impl Columns {
    fn new(id_column: &str) -> Self {
        Self {
            names: vec![id_column.to_string()],
            known: HashSet::from([id_column.to_string()]),
        }
    }

    fn add(&mut self, name: &str) {
        if self.known.insert(name.to_string()) {
            self.names.push(name.to_string());
        }
    }
}

/// Join `base` with each detail set in turn, keyed by listing id.
///
/// Every base id yields exactly one record, in base order; base ids
/// without a detail keep null detail columns. Detail values never
/// overwrite a non-null base value. Attribute maps become one column per
/// distinct key, placed after all regular columns.
pub fn join(
    id_column: &str,
    base: Vec<ListingSummary>,
    detail_sets: &[Vec<ListingDetail>],
) -> ListingTable {
    let mut columns = Columns::new(id_column);
    let mut attribute_columns = Columns::new(id_column);
    let mut table = ListingTable::new(id_column);

    let mut seen = HashSet::new();
    for summary in base {
        if !seen.insert(summary.id.clone()) {
            log::debug!("Join: ignoring repeated base id {}", summary.id);
            continue;
        }
        for name in summary.fields.keys() {
            columns.add(name);
        }
        table.records.push(ListingRecord {
            id: summary.id,
            fields: summary.fields,
        });
    }

    let positions = table.positions();
    for details in detail_sets {
        let mut unmatched = 0usize;
        for detail in details {
            let Some(&pos) = positions.get(&detail.id) else {
                unmatched += 1;
                continue;
            };
            let record = &mut table.records[pos];

            for (name, value) in &detail.fields {
                columns.add(name);
                merge(record, name, value.clone());
            }
            for (key, value) in &detail.attributes {
                attribute_columns.add(key);
                merge(record, key, Value::String(value.clone()));
            }
        }
        if unmatched > 0 {
            log::debug!("Join: {unmatched} details had no matching base listing");
        }
    }

    table.columns = columns.names;
    for name in attribute_columns.names.into_iter().skip(1) {
        if !columns.known.contains(&name) {
            table.columns.push(name);
        }
    }
    table
}

fn merge(record: &mut ListingRecord, name: &str, value: Value) {
    match record.fields.get_mut(name) {
        Some(existing) if !existing.is_null() => {}
        Some(existing) => *existing = value,
        None => {
            record.fields.insert(name.to_string(), value);
        }
    }
}
