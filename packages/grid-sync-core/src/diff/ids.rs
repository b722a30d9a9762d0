//! Identifier assignment for inserted rows.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::error::ApplyError;
use crate::table::{Record, Snapshot, Value};

/// Random draws before falling back to a bounded scan.
const RANDOM_ATTEMPTS: usize = 64;

/// How inserted rows get their identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdAssignment {
    /// The store assigns identifiers (identity column); inserts carry none
    #[default]
    StoreAssigned,
    /// Uniform random integer in `[low, high)`, unused in snapshot and batch
    Random { low: i64, high: i64 },
    /// One past the largest integer identifier seen so far
    Sequential,
}

impl IdAssignment {
    /// Random assignment over the configured range.
    pub fn random(config: &SyncConfig) -> Self {
        IdAssignment::Random {
            low: config.random_id_low,
            high: config.random_id_high,
        }
    }
}

/// Hashable identity of an identifier value. Integral floats collapse onto
/// integers so `3.0` and `3` collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdKey {
    Int(i64),
    FloatBits(u64),
    Bool(bool),
    Text(String),
}

impl IdKey {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(IdKey::Bool(*b)),
            Value::Int(i) => Some(IdKey::Int(*i)),
            Value::Float(f) => Some(match value.as_i64() {
                Some(i) => IdKey::Int(i),
                None => IdKey::FloatBits(f.to_bits()),
            }),
            Value::Text(s) => Some(IdKey::Text(s.clone())),
        }
    }
}

/// Tracks identifiers used by a snapshot plus the batch being built.
pub(crate) struct IdAllocator {
    assignment: IdAssignment,
    used: HashSet<IdKey>,
    max_int: Option<i64>,
}

impl IdAllocator {
    /// Seeds the allocator with every identifier in `snapshot`.
    pub(crate) fn new(assignment: IdAssignment, snapshot: &Snapshot) -> Self {
        let mut allocator = Self {
            assignment,
            used: HashSet::new(),
            max_int: None,
        };
        if assignment != IdAssignment::StoreAssigned {
            for id in snapshot.identifiers() {
                allocator.mark_used(id);
            }
        }
        allocator
    }

    fn mark_used(&mut self, id: &Value) -> bool {
        if let Some(i) = id.as_i64() {
            self.max_int = Some(self.max_int.map_or(i, |m| m.max(i)));
        }
        match IdKey::of(id) {
            Some(key) => self.used.insert(key),
            None => true,
        }
    }

    /// Marks the identifier supplied by an added row as used.
    ///
    /// Runs over every added row before any identifier is generated, so a
    /// generated value never takes one a later row supplies.
    pub(crate) fn reserve(&mut self, record: &Record, id_column: &str) -> Result<(), ApplyError> {
        if self.assignment == IdAssignment::StoreAssigned {
            return Ok(());
        }
        match record.get_non_null(id_column) {
            Some(id) if !self.mark_used(id) => {
                Err(ApplyError::DuplicateIdentifier { id: id.clone() })
            }
            _ => Ok(()),
        }
    }

    /// Settles the identifier column of an added row.
    ///
    /// Store-assigned: the column is dropped. Client-assigned: a supplied
    /// identifier (already reserved) is kept, a missing one is generated.
    pub(crate) fn claim(&mut self, record: &mut Record, id_column: &str) -> Result<(), ApplyError> {
        if self.assignment == IdAssignment::StoreAssigned {
            record.remove(id_column);
            return Ok(());
        }
        if record.get_non_null(id_column).is_some() {
            return Ok(());
        }

        let id = match self.assignment {
            IdAssignment::Random { low, high } => self.generate_random(low, high)?,
            _ => self.next_sequential()?,
        };
        self.mark_used(&Value::Int(id));
        record.insert(id_column, Value::Int(id));
        Ok(())
    }

    fn next_sequential(&self) -> Result<i64, ApplyError> {
        match self.max_int {
            None => Ok(1),
            Some(max) => max
                .checked_add(1)
                .ok_or(ApplyError::IdentifierSpaceExhausted {
                    low: 1,
                    high: i64::MAX,
                }),
        }
    }

    fn generate_random(&self, low: i64, high: i64) -> Result<i64, ApplyError> {
        let exhausted = ApplyError::IdentifierSpaceExhausted { low, high };
        if high <= low {
            return Err(exhausted);
        }

        let mut rng = rand::thread_rng();
        for _ in 0..RANDOM_ATTEMPTS {
            let candidate = rng.gen_range(low..high);
            if !self.used.contains(&IdKey::Int(candidate)) {
                return Ok(candidate);
            }
        }

        // Among used.len() + 1 consecutive values at least one is free.
        let span = high.saturating_sub(low).min(self.used.len() as i64 + 1);
        (low..low + span)
            .find(|candidate| !self.used.contains(&IdKey::Int(*candidate)))
            .ok_or(exhausted)
    }
}
