//! Reversible change records and the undo/redo stacks built from them.

pub mod change;
pub(crate) mod relocate;
pub mod tracker;

pub use change::{Change, ChangeKind, ContentChange, TopologyChange};
pub use tracker::{ChangeCollection, ChangeCollectionGroup, ChangeTracker};
