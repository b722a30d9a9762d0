use serde::{Deserialize, Serialize};

use crate::table::{Record, Value};

/// A single row-store mutation derived from a change-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Set `fields` on the row identified by `id`
    Update {
        /// Identifier of the row to update
        id: Value,
        /// Changed columns only
        fields: Record,
    },
    /// Delete the row identified by `id`
    Delete {
        /// Identifier of the row to delete
        id: Value,
    },
    /// Insert a new row
    Insert {
        /// Column values; carries the identifier only for client-assigned ids
        fields: Record,
    },
}

impl Mutation {
    /// Returns the identifier this mutation targets, if any.
    pub fn id(&self) -> Option<&Value> {
        match self {
            Mutation::Update { id, .. } | Mutation::Delete { id } => Some(id),
            Mutation::Insert { .. } => None,
        }
    }

    /// Short operation name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
            Mutation::Insert { .. } => "insert",
        }
    }
}

/// Ordered list of mutations from one change-set.
///
/// Execution is not atomic across the batch; see `RowStore::execute_batch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationBatch {
    mutations: Vec<Mutation>,
}

impl MutationBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            mutations: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mutation> {
        self.mutations.iter()
    }

    pub fn as_slice(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Number of mutations of the given kind.
    pub fn count(&self, kind: &str) -> usize {
        self.mutations.iter().filter(|m| m.kind() == kind).count()
    }
}

impl From<Vec<Mutation>> for MutationBatch {
    fn from(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }
}

impl<'a> IntoIterator for &'a MutationBatch {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}

impl IntoIterator for MutationBatch {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}
