//! Editable byte buffers for hexed
//!
//! This crate provides the editing engine behind the hex editor:
//! - Memory-mapped or in-memory backing sources that are never copied
//! - A chunk list of source windows and in-memory edits
//! - Exactly reversible write, insert and delete with grouped undo/redo
//! - KMP search across chunk boundaries with cancellation
//! - Change notifications over channels

pub mod buffer;
pub mod chunk;
pub mod error;
pub mod event;
pub mod find;
pub mod history;
pub mod list;
pub mod pool;
pub mod source;

// Re-export main types for convenience
pub use buffer::{Buffer, FindOptions, ReadOutcome};
pub use chunk::{Chunk, ChunkKind, MemoryChunk, SourceChunk};
pub use error::{BufferError, BufferResult};
pub use event::{BufferEvent, ChangeOrigin, Modification};
pub use find::{Cancelled, Direction, Kmp};
pub use hexed_config::{BufferConfig, OpenMode};
pub use list::{ChunkList, NodeId};
pub use source::Source;
pub use tokio_util::sync::CancellationToken;
