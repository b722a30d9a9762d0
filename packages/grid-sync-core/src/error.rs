//! Error types for diffing and store operations.

use thiserror::Error;

use crate::diff::Mutation;
use crate::table::Value;

/// Errors raised while turning a change-set into a mutation batch.
///
/// All of these are detected before the batch is returned, so a failed
/// `apply` never yields a partial batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    /// Position does not index into the rendered snapshot
    #[error("Position {position} is out of range for snapshot of {len} rows")]
    OutOfRange { position: usize, len: usize },

    /// Snapshot row has no identifier value
    #[error("Row at position {position} has no value for identifier column '{column}'")]
    MissingIdentifier { position: usize, column: String },

    /// Edit touches the identifier column
    #[error("Edit at position {position} modifies identifier column '{column}'")]
    IdentifierEdited { position: usize, column: String },

    /// Added row carries an identifier already in use
    #[error("Identifier {id} is already in use")]
    DuplicateIdentifier { id: Value },

    /// Random generator could not find a free identifier
    #[error("No free identifier in range [{low}, {high})")]
    IdentifierSpaceExhausted { low: i64, high: i64 },

    /// Value cannot be cast to the column type
    #[error("Type mismatch in column '{column}': expected {expected}, got {got}")]
    TypeMismatch {
        column: String,
        expected: String,
        got: String,
    },
}

/// Errors raised by the in-crate row stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No row with this identifier
    #[error("Row with identifier {id} not found in table '{table}'")]
    RowNotFound { table: String, id: Value },

    /// Insert without a client-supplied identifier
    #[error("Insert into table '{table}' is missing identifier column '{column}'")]
    MissingIdentifier { table: String, column: String },

    /// Insert with an identifier already present
    #[error("Identifier {id} already exists in table '{table}'")]
    DuplicateIdentifier { table: String, id: Value },

    /// Lock poisoned
    #[error("Lock poisoned")]
    LockPoisoned,

    /// Data corruption detected
    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| StoreError::Io { context, source }
    }
}

/// A mutation batch stopped part-way through.
///
/// The first `applied` mutations were applied and remain applied; nothing
/// after the failing one was attempted. Never retried automatically.
#[derive(Error, Debug)]
#[error("Batch failed after {applied} mutations applied: {source}")]
pub struct PartialBatchFailure<E>
where
    E: std::error::Error + 'static,
{
    /// Number of mutations that were applied and remain applied
    pub applied: usize,
    /// Index of the failing mutation; `None` when the batch failed as a
    /// whole, e.g. while committing a staged table file
    pub index: Option<usize>,
    /// The failing mutation, when one is to blame
    pub mutation: Option<Mutation>,
    /// Store error, unmodified
    #[source]
    pub source: E,
}

impl<E> PartialBatchFailure<E>
where
    E: std::error::Error + 'static,
{
    /// Failure of the mutation at `index` after `applied` others succeeded.
    pub fn at(applied: usize, index: usize, mutation: &Mutation, source: E) -> Self {
        Self {
            applied,
            index: Some(index),
            mutation: Some(mutation.clone()),
            source,
        }
    }
}
