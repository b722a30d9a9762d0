use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::table::Record;

/// Edits reported by the data grid for one submission.
///
/// Positions in `edited` and `deleted` refer to the rendered snapshot, not
/// to the store after any mutation. Deserializes from the editor payload
/// (`added_rows`, `edited_rows`, `deleted_rows`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// New rows, without identifiers
    #[serde(default, rename = "added_rows", alias = "added")]
    pub added: Vec<Record>,
    /// Changed columns keyed by snapshot position
    #[serde(default, rename = "edited_rows", alias = "edited")]
    pub edited: BTreeMap<usize, Record>,
    /// Snapshot positions to delete
    #[serde(default, rename = "deleted_rows", alias = "deleted")]
    pub deleted: BTreeSet<usize>,
}

impl ChangeSet {
    /// Creates an empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new row.
    pub fn add(mut self, record: Record) -> Self {
        self.added.push(record);
        self
    }

    /// Records changed columns for the row at `position`, merging with any
    /// earlier edit of the same row.
    pub fn edit(mut self, position: usize, fields: Record) -> Self {
        self.edited.entry(position).or_default().merge(&fields);
        self
    }

    /// Marks the row at `position` for deletion.
    pub fn delete(mut self, position: usize) -> Self {
        self.deleted.insert(position);
        self
    }

    /// Returns `true` when all three parts are empty.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.edited.is_empty() && self.deleted.is_empty()
    }
}
