//! Row model shared by snapshots, change-sets and stores.
//!
//! - `Value`: scalar cell value
//! - `Record`: column name to value mapping
//! - `Schema`: column types used for casting edited values
//! - `Snapshot`: rows as rendered to the editor, with the identifier column

mod record;
mod schema;
mod snapshot;
mod value;

pub use record::Record;
pub use schema::{Column, ColumnType, Schema};
pub use snapshot::Snapshot;
pub use value::Value;
