//! Change-set diffing: grid edits to ordered row-store mutations.

mod applier;
mod change_set;
mod ids;
mod mutation;

pub use applier::DiffApplier;
pub use change_set::ChangeSet;
pub use ids::IdAssignment;
pub use mutation::{Mutation, MutationBatch};
