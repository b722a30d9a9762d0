//! Render/submit cycle over a row store.
//!
//! A session holds the snapshot last shown to the editor. Each submission
//! is diffed against that snapshot, executed, and followed by a fresh read,
//! so positions never outlive the render they came from.

use std::time::Duration;

use thiserror::Error;

use crate::config::SyncConfig;
use crate::diff::{ChangeSet, DiffApplier, MutationBatch};
use crate::error::{ApplyError, PartialBatchFailure};
use crate::store::{retry_read, BatchReport, RowStore};
use crate::table::{Schema, Snapshot};

/// Errors from submitting a change-set.
#[derive(Error, Debug)]
pub enum SessionError<E>
where
    E: std::error::Error + 'static,
{
    /// Change-set could not be turned into a batch; nothing was executed
    #[error("Change-set rejected: {0}")]
    Apply(#[from] ApplyError),

    /// Batch stopped part-way
    #[error(transparent)]
    Batch(#[from] PartialBatchFailure<E>),

    /// Store failed while re-reading the snapshot
    #[error("Store error: {0}")]
    Store(#[source] E),
}

/// Edit session bound to one store.
#[derive(Debug)]
pub struct EditSession<S: RowStore> {
    store: S,
    applier: DiffApplier,
    snapshot: Snapshot,
    read_max_retries: u32,
    read_retry_delay: Duration,
}

impl<S: RowStore> EditSession<S> {
    /// Opens a session and reads the first snapshot.
    ///
    /// # Arguments
    /// * `store` - Row store to edit
    /// * `config` - Read retry settings
    ///
    /// # Returns
    /// `Result<EditSession<S>, S::Error>`; the initial read is retried.
    pub fn open(store: S, config: &SyncConfig) -> Result<Self, S::Error> {
        let read_max_retries = config.read_max_retries;
        let read_retry_delay = Duration::from_millis(config.read_retry_delay_ms);
        let snapshot = retry_read(
            || store.read(),
            read_max_retries,
            read_retry_delay,
            "initial snapshot read",
        )?;
        let applier = DiffApplier::new().with_id_assignment(store.id_assignment());

        tracing::info!(rows = snapshot.len(), "Edit session opened");
        Ok(Self {
            store,
            applier,
            snapshot,
            read_max_retries,
            read_retry_delay,
        })
    }

    /// Casts submitted values through `schema`.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.applier = self.applier.with_schema(schema);
        self
    }

    /// The snapshot currently rendered.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Re-reads the snapshot from the store.
    pub fn refresh(&mut self) -> Result<&Snapshot, S::Error> {
        self.snapshot = retry_read(
            || self.store.read(),
            self.read_max_retries,
            self.read_retry_delay,
            "snapshot refresh",
        )?;
        Ok(&self.snapshot)
    }

    /// Diffs `changes` against the current snapshot without executing.
    pub fn plan(&self, changes: ChangeSet) -> Result<MutationBatch, ApplyError> {
        self.applier.apply(&self.snapshot, changes)
    }

    /// Applies `changes` to the store and refreshes the snapshot.
    ///
    /// The snapshot is refreshed after any execution attempt, including a
    /// partial failure, since the store may have changed shape.
    pub fn submit(&mut self, changes: ChangeSet) -> Result<BatchReport, SessionError<S::Error>> {
        let batch = self.plan(changes)?;
        if batch.is_empty() {
            return Ok(BatchReport::default());
        }

        let executed = self.store.execute_batch(&batch);
        let refreshed = self.refresh().map(|_| ());

        match (executed, refreshed) {
            (Ok(report), Ok(())) => {
                tracing::info!(
                    updated = report.updated,
                    deleted = report.deleted,
                    inserted = report.inserted,
                    "Change-set submitted"
                );
                Ok(report)
            }
            (Ok(_), Err(e)) => Err(SessionError::Store(e)),
            (Err(failure), Ok(())) => Err(failure.into()),
            (Err(failure), Err(e)) => {
                tracing::warn!("Snapshot refresh failed after batch failure: {}", e);
                Err(failure.into())
            }
        }
    }
}
