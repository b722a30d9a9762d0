//! Shared fixtures.

use grid_sync_core::store::MemoryTable;
use grid_sync_core::{Record, Snapshot, Value};

/// Demo product rows, without identifiers.
pub fn product_rows() -> Vec<Record> {
    [
        ("Product A", "Category 1"),
        ("Product B", "Category 2"),
        ("Product C", "Category 3"),
    ]
    .into_iter()
    .map(|(name, category)| Record::from_iter([("name", name), ("category", category)]))
    .collect()
}

/// Demo product rows with explicit identifiers.
pub fn product_rows_with_ids(ids: &[i64]) -> Vec<Record> {
    product_rows()
        .into_iter()
        .zip(ids)
        .map(|(mut row, &id)| {
            row.insert("id", Value::Int(id));
            row
        })
        .collect()
}

/// Memory table seeded with the demo products (ids 1..=3).
pub fn product_table() -> MemoryTable {
    MemoryTable::with_rows("product", "id", product_rows())
}

/// Snapshot over the demo products with the given identifiers.
pub fn product_snapshot(ids: &[i64]) -> Snapshot {
    Snapshot::new("id", product_rows_with_ids(ids))
}

pub fn name(value: &str) -> Record {
    Record::from_iter([("name", value)])
}
