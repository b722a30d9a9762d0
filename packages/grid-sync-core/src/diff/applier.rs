use crate::error::ApplyError;
use crate::table::{Record, Schema, Snapshot, Value};

use super::change_set::ChangeSet;
use super::ids::{IdAllocator, IdAssignment};
use super::mutation::{Mutation, MutationBatch};

/// Turns a change-set into an ordered mutation batch.
///
/// Pure transformation: no I/O, no shared state between calls. The batch is
/// ordered edit, then delete, then add, with every position resolved to an
/// identifier against the rendered snapshot before any insert is built.
#[derive(Debug, Clone, Default)]
pub struct DiffApplier {
    ids: IdAssignment,
    schema: Option<Schema>,
}

impl DiffApplier {
    /// Creates an applier for stores that assign identifiers themselves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how inserted rows get their identifier.
    pub fn with_id_assignment(mut self, ids: IdAssignment) -> Self {
        self.ids = ids;
        self
    }

    /// Casts edited and added values through `schema`.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn id_assignment(&self) -> IdAssignment {
        self.ids
    }

    /// Builds the mutation batch for `changes` against `snapshot`.
    ///
    /// # Arguments
    /// * `snapshot` - Rows as rendered when the edits were made
    /// * `changes` - The submission; consumed
    ///
    /// # Returns
    /// `Result<MutationBatch, ApplyError>`. On error no batch is produced.
    pub fn apply(
        &self,
        snapshot: &Snapshot,
        changes: ChangeSet,
    ) -> Result<MutationBatch, ApplyError> {
        if changes.is_empty() {
            tracing::debug!("Empty change-set, nothing to apply");
            return Ok(MutationBatch::new());
        }

        let ChangeSet {
            added,
            edited,
            deleted,
        } = changes;
        let id_column = snapshot.id_column();
        let len = snapshot.len();

        // Every position must index the rendered snapshot
        if let Some(&position) = edited
            .keys()
            .chain(deleted.iter())
            .find(|&&position| position >= len)
        {
            return Err(ApplyError::OutOfRange { position, len });
        }

        // Resolve identifiers before anything changes the store's shape
        let mut updates: Vec<(Value, Record)> = Vec::with_capacity(edited.len());
        for (position, fields) in edited {
            if fields.contains(id_column) {
                return Err(ApplyError::IdentifierEdited {
                    position,
                    column: id_column.to_string(),
                });
            }
            if fields.is_empty() || deleted.contains(&position) {
                tracing::debug!(position, "Skipping edit of row that is deleted or unchanged");
                continue;
            }
            let id = snapshot.identifier_at(position)?.clone();
            updates.push((id, self.cast(fields)?));
        }

        let deletes = deleted
            .iter()
            .map(|&position| snapshot.identifier_at(position).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        let mut batch = MutationBatch::with_capacity(updates.len() + deletes.len() + added.len());
        for (id, fields) in updates {
            batch.push(Mutation::Update { id, fields });
        }
        for id in deletes {
            batch.push(Mutation::Delete { id });
        }

        let mut allocator = IdAllocator::new(self.ids, snapshot);
        let added = added
            .into_iter()
            .map(|fields| self.cast(fields))
            .collect::<Result<Vec<_>, _>>()?;
        for fields in &added {
            allocator.reserve(fields, id_column)?;
        }
        for mut fields in added {
            allocator.claim(&mut fields, id_column)?;
            batch.push(Mutation::Insert { fields });
        }

        tracing::debug!(
            updates = batch.count("update"),
            deletes = batch.count("delete"),
            inserts = batch.count("insert"),
            "Built mutation batch"
        );
        Ok(batch)
    }

    fn cast(&self, fields: Record) -> Result<Record, ApplyError> {
        match &self.schema {
            Some(schema) => schema.cast_record(fields),
            None => Ok(fields),
        }
    }
}
