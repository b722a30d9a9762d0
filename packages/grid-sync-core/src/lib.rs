//! Applies data-grid change-sets to row stores.
//!
//! Provides the row/value model, the diff applier that turns grid edits
//! into mutation batches, row stores (memory, table file, SQL), parameterized
//! statement building, and a freshness waiter for lagging read paths.

pub mod config;
pub mod consistency;
pub mod diff;
pub mod error;
pub mod session;
pub mod sql;
pub mod store;
pub mod table;

pub use consistency::ConsistencyWaiter;
pub use diff::{ChangeSet, DiffApplier, IdAssignment, Mutation, MutationBatch};
pub use session::EditSession;
pub use store::{BatchReport, RowStore};
pub use table::{Record, Schema, Snapshot, Value};
