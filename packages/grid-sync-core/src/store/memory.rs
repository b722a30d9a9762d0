//! In-memory table with a store-assigned identity column.
//!
//! Rows live behind an `ArcSwap`: readers take a lock-free snapshot while
//! writers publish a new copy of the row vector.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::diff::{IdAssignment, Mutation};
use crate::error::StoreError;
use crate::table::{Record, Snapshot, Value};

use super::RowStore;

/// In-memory table with identity semantics (`IDENTITY(1,1)`).
#[derive(Debug)]
pub struct MemoryTable {
    /// Table name
    name: String,
    /// Identifier column name
    id_column: String,
    /// Published rows in insertion order
    rows: ArcSwap<Vec<Record>>,
    /// Serializes writers; readers never take it
    write_lock: Mutex<()>,
    /// Next identity value to assign
    next_id: AtomicI64,
    /// Bumped on every applied mutation; usable as a freshness signal
    version: AtomicU64,
}

impl MemoryTable {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_column: id_column.into(),
            rows: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
            next_id: AtomicI64::new(1),
            version: AtomicU64::new(0),
        }
    }

    /// Creates a table seeded with `rows`, assigning identities in order.
    pub fn with_rows(
        name: impl Into<String>,
        id_column: impl Into<String>,
        rows: impl IntoIterator<Item = Record>,
    ) -> Self {
        let table = Self::new(name, id_column);
        let seeded: Vec<Record> = rows
            .into_iter()
            .map(|mut row| {
                row.insert(table.id_column.clone(), table.allocate_id());
                row
            })
            .collect();
        table.rows.store(Arc::new(seeded));
        table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows currently published.
    pub fn len(&self) -> usize {
        self.rows.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.load().is_empty()
    }

    /// Current version; changes after every applied mutation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn allocate_id(&self) -> Value {
        Value::Int(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn position_of(&self, rows: &[Record], id: &Value) -> Result<usize, StoreError> {
        rows.iter()
            .position(|row| row.get(&self.id_column) == Some(id))
            .ok_or_else(|| StoreError::RowNotFound {
                table: self.name.clone(),
                id: id.clone(),
            })
    }
}

impl RowStore for MemoryTable {
    type Error = StoreError;

    fn read(&self) -> Result<Snapshot, StoreError> {
        let rows = self.rows.load_full();
        Ok(Snapshot::new(self.id_column.clone(), rows.as_ref().clone()))
    }

    /// Applies one mutation. Inserts always get a fresh identity; any
    /// identifier supplied by the caller is overwritten.
    fn apply(&self, mutation: &Mutation) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut rows = self.rows.load_full().as_ref().clone();

        match mutation {
            Mutation::Update { id, fields } => {
                let position = self.position_of(&rows, id)?;
                rows[position].merge(fields);
            }
            Mutation::Delete { id } => {
                let position = self.position_of(&rows, id)?;
                rows.remove(position);
            }
            Mutation::Insert { fields } => {
                let mut row = fields.clone();
                row.insert(self.id_column.clone(), self.allocate_id());
                rows.push(row);
            }
        }

        self.rows.store(Arc::new(rows));
        self.version.fetch_add(1, Ordering::Release);
        Ok(())
    }

    fn id_assignment(&self) -> IdAssignment {
        IdAssignment::StoreAssigned
    }
}
