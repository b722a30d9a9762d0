//! Row stores that snapshots are read from and mutation batches run against.

mod file;
mod memory;
mod retry;
mod sql;

use std::sync::Arc;

use serde::Serialize;

use crate::diff::{IdAssignment, Mutation, MutationBatch};
use crate::error::PartialBatchFailure;
use crate::table::Snapshot;

pub use file::FileTable;
pub use memory::MemoryTable;
pub use retry::retry_read;
pub use sql::{SqlClient, SqlTable};

/// A table that can be read as a snapshot and mutated.
///
/// Store errors are surfaced unmodified; nothing here wraps or retries them.
pub trait RowStore {
    /// Error type of the underlying store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the current rows in display order.
    fn read(&self) -> Result<Snapshot, Self::Error>;

    /// Applies a single mutation.
    fn apply(&self, mutation: &Mutation) -> Result<(), Self::Error>;

    /// How inserts into this store must carry identifiers.
    fn id_assignment(&self) -> IdAssignment;

    /// Applies a batch in order.
    ///
    /// The default is fail-fast: stop at the first failing mutation and
    /// report how many were applied before it. Applied mutations stay
    /// applied.
    fn execute_batch(
        &self,
        batch: &MutationBatch,
    ) -> Result<BatchReport, PartialBatchFailure<Self::Error>> {
        execute_fail_fast(self, batch)
    }
}

/// Applies `batch` one mutation at a time, stopping at the first failure.
pub fn execute_fail_fast<S>(
    store: &S,
    batch: &MutationBatch,
) -> Result<BatchReport, PartialBatchFailure<S::Error>>
where
    S: RowStore + ?Sized,
{
    let mut report = BatchReport::default();
    for (index, mutation) in batch.iter().enumerate() {
        if let Err(source) = store.apply(mutation) {
            tracing::error!(
                index,
                applied = report.total(),
                op = mutation.kind(),
                "Mutation failed, stopping batch: {}",
                source
            );
            return Err(PartialBatchFailure::at(
                report.total(),
                index,
                mutation,
                source,
            ));
        }
        report.record(mutation);
    }
    tracing::debug!(
        updated = report.updated,
        deleted = report.deleted,
        inserted = report.inserted,
        "Batch executed"
    );
    Ok(report)
}

impl<S: RowStore + ?Sized> RowStore for Arc<S> {
    type Error = S::Error;

    fn read(&self) -> Result<Snapshot, Self::Error> {
        (**self).read()
    }

    fn apply(&self, mutation: &Mutation) -> Result<(), Self::Error> {
        (**self).apply(mutation)
    }

    fn id_assignment(&self) -> IdAssignment {
        (**self).id_assignment()
    }

    fn execute_batch(
        &self,
        batch: &MutationBatch,
    ) -> Result<BatchReport, PartialBatchFailure<Self::Error>> {
        (**self).execute_batch(batch)
    }
}

/// Counts of mutations applied by a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub updated: usize,
    pub deleted: usize,
    pub inserted: usize,
}

impl BatchReport {
    /// Total mutations applied.
    pub fn total(&self) -> usize {
        self.updated + self.deleted + self.inserted
    }

    /// Counts `mutation`. Updates without columns change nothing and are
    /// not counted.
    pub(crate) fn record(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Update { fields, .. } if fields.is_empty() => {}
            Mutation::Update { .. } => self.updated += 1,
            Mutation::Delete { .. } => self.deleted += 1,
            Mutation::Insert { .. } => self.inserted += 1,
        }
    }

    /// Report for a batch applied in full.
    pub(crate) fn of(batch: &MutationBatch) -> Self {
        let mut report = Self::default();
        for mutation in batch {
            report.record(mutation);
        }
        report
    }
}
