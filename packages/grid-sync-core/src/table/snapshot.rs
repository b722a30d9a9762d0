use serde::{Deserialize, Serialize};

use crate::error::ApplyError;

use super::record::Record;
use super::value::Value;

/// Rows as rendered to the editor before the current submission.
///
/// Positions index into `rows` and are only meaningful for this snapshot;
/// any mutation of the underlying store invalidates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    id_column: String,
    rows: Vec<Record>,
}

impl Snapshot {
    /// Creates a snapshot over `rows` keyed by `id_column`.
    pub fn new(id_column: impl Into<String>, rows: Vec<Record>) -> Self {
        Self {
            id_column: id_column.into(),
            rows,
        }
    }

    /// Returns the identifier column name.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row at `position`.
    pub fn get(&self, position: usize) -> Option<&Record> {
        self.rows.get(position)
    }

    /// Resolves the identifier of the row at `position`.
    ///
    /// # Returns
    /// `Result<&Value, ApplyError>` with `OutOfRange` for a bad position and
    /// `MissingIdentifier` for a row without a non-null identifier.
    pub fn identifier_at(&self, position: usize) -> Result<&Value, ApplyError> {
        let row = self.rows.get(position).ok_or(ApplyError::OutOfRange {
            position,
            len: self.rows.len(),
        })?;
        row.get_non_null(&self.id_column)
            .ok_or_else(|| ApplyError::MissingIdentifier {
                position,
                column: self.id_column.clone(),
            })
    }

    /// Iterates the non-null identifiers of all rows.
    pub fn identifiers(&self) -> impl Iterator<Item = &Value> {
        self.rows
            .iter()
            .filter_map(|row| row.get_non_null(&self.id_column))
    }
}
