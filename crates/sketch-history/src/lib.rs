/// Checkpointed undo/redo history for layered drawings.
///
/// Provides a `HistoryBuffer` that records immutable layers, seals a
/// cumulative checkpoint every `checkpoint_gap` layers, and reduces the valid
/// history from the latest checkpoint instead of replaying from the start.
/// Undo and redo move cursors; appending after an undo truncates the redo tail.
pub mod buffer;
pub mod config;
pub mod cursor;
pub mod snapshot;

pub use buffer::{Combiner, HistoryBuffer};
pub use config::HistoryConfig;
pub use cursor::{checkpoint_delta, Cursors};
pub use snapshot::Snapshot;
