mod edit;
mod search;

pub use search::FindOptions;

use crate::chunk::Chunk;
use crate::error::{BufferError, BufferResult};
use crate::event::{BufferEvent, ChangeOrigin, EventBus, Modification};
use crate::history::{ChangeCollection, ChangeTracker};
use crate::list::ChunkList;
use crate::pool::ScratchPool;
use crate::source::Source;
use crossbeam_channel::Receiver;
use hexed_config::BufferConfig;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of [`Buffer::read_async`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOutcome {
    pub bytes_read: usize,
    /// Logical ranges of the read that come from edited (memory) chunks.
    pub unsaved: Vec<Range<usize>>,
}

impl ReadOutcome {
    fn mark_unsaved(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        match self.unsaved.last_mut() {
            Some(last) if last.end == range.start => last.end = range.end,
            _ => self.unsaved.push(range),
        }
    }
}

/// An editable byte document over a file or byte array.
///
/// Unedited bytes stay in the backing [`Source`]; edits live in memory
/// chunks linked between windows onto it. Every edit is recorded and can be
/// undone exactly.
#[derive(Debug)]
pub struct Buffer {
    list: ChunkList,
    source: Arc<Source>,
    tracker: ChangeTracker,
    events: EventBus,
    pool: ScratchPool,
    config: BufferConfig,
}

impl Buffer {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_bytes_with_config(bytes, BufferConfig::default())
    }

    pub fn from_bytes_with_config(bytes: impl Into<Vec<u8>>, config: BufferConfig) -> Self {
        Self::with_source(Arc::new(Source::from_bytes(bytes)), config)
    }

    pub fn open(path: impl AsRef<Path>) -> BufferResult<Self> {
        Self::open_with_config(path, BufferConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: BufferConfig) -> BufferResult<Self> {
        let source = Source::open(path, config.open_mode)?;
        Ok(Self::with_source(Arc::new(source), config))
    }

    /// Opens `path` with the configuration stored under `root`, if any.
    pub fn open_in(root: impl AsRef<Path>, path: impl AsRef<Path>) -> BufferResult<Self> {
        let config = BufferConfig::load_or_default(root)?;
        Self::open_with_config(path, config)
    }

    fn with_source(source: Arc<Source>, mut config: BufferConfig) -> Self {
        config.normalize();
        let first = if source.is_empty() {
            Chunk::memory(Vec::new())
        } else {
            Chunk::source(source.clone(), 0, source.len())
        };
        tracing::debug!(
            len = source.len(),
            read_only = source.is_read_only(),
            track_history = config.track_history,
            "created buffer"
        );
        Self {
            list: ChunkList::new(first),
            tracker: ChangeTracker::new(config.track_history),
            events: EventBus::default(),
            pool: ScratchPool::new(config.read_window, config.scratch_pool_limit),
            source,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.list.len_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the backing source, before any edit.
    pub fn original_len(&self) -> usize {
        self.source.len()
    }

    pub fn is_read_only(&self) -> bool {
        self.source.is_read_only()
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.list.iter().map(|(_, chunk)| chunk)
    }

    pub fn chunk_list(&self) -> &ChunkList {
        &self.list
    }

    pub fn subscribe(&mut self) -> Receiver<BufferEvent> {
        self.events.subscribe()
    }

    /// Copies bytes starting at `offset` into `dest`; returns how many were copied.
    pub fn read(&self, offset: usize, dest: &mut [u8]) -> usize {
        self.check_offset(offset);
        self.list.read(offset, dest)
    }

    /// The whole logical content.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.len()];
        self.list.read(0, &mut bytes);
        bytes
    }

    /// Reads like [`Buffer::read`], yielding to the runtime before every
    /// source-backed chunk and stopping with [`BufferError::Cancelled`] when
    /// `cancel` fires between chunks.
    pub async fn read_async(
        &self,
        offset: usize,
        dest: &mut [u8],
        cancel: &CancellationToken,
    ) -> BufferResult<ReadOutcome> {
        self.check_offset(offset);
        let wanted = dest.len().min(self.len() - offset);
        let mut outcome = ReadOutcome::default();

        for (_, start, chunk) in self.list.spans() {
            if outcome.bytes_read == wanted {
                break;
            }
            let position = offset + outcome.bytes_read;
            if start + chunk.len() <= position {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(BufferError::Cancelled);
            }
            if !chunk.is_memory() {
                tokio::task::yield_now().await;
            }
            let copied = chunk.read(&mut dest[outcome.bytes_read..wanted], position - start);
            if chunk.is_memory() {
                outcome.mark_unsaved(position..position + copied);
            }
            outcome.bytes_read += copied;
        }
        Ok(outcome)
    }

    /// Overwrites bytes at `offset`; bytes past the end extend the buffer.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        self.check_offset(offset);
        if bytes.is_empty() {
            return;
        }
        let previous = self.len();
        let collection = edit::write(&mut self.list, offset, bytes);
        self.commit(collection, previous);
    }

    pub fn insert(&mut self, offset: usize, bytes: &[u8]) {
        self.check_offset(offset);
        if bytes.is_empty() {
            return;
        }
        let previous = self.len();
        let collection = edit::insert(&mut self.list, offset, bytes);
        self.commit(collection, previous);
    }

    pub fn delete(&mut self, offset: usize, len: usize) {
        let end = offset.checked_add(len);
        assert!(
            end.is_some_and(|end| end <= self.len()),
            "delete of {len} bytes at {offset} past end of buffer ({})",
            self.len()
        );
        if len == 0 {
            return;
        }
        let previous = self.len();
        let collection = edit::delete(&mut self.list, offset, len);
        self.commit(collection, previous);
    }

    /// Applies a recorded modification as a user edit.
    pub fn apply(&mut self, modification: &Modification) {
        match modification {
            Modification::Write { offset, bytes } => self.write(*offset, bytes),
            Modification::Insert { offset, bytes } => self.insert(*offset, bytes),
            Modification::Delete { offset, len } => self.delete(*offset, *len),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.tracker.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.tracker.can_redo()
    }

    /// Reverts the most recent group; returns the modifications that describe the revert.
    ///
    /// # Panics
    ///
    /// When there is nothing to undo or a group is still open.
    pub fn undo(&mut self) -> Vec<Modification> {
        let previous = self.len();
        let modifications = self.tracker.undo(&mut self.list);
        tracing::debug!(count = modifications.len(), chunks = self.list.node_count(), "undo");
        self.notify(&modifications, ChangeOrigin::Undo, previous);
        modifications
    }

    /// Reapplies the most recently undone group.
    ///
    /// # Panics
    ///
    /// When there is nothing to redo or a group is still open.
    pub fn redo(&mut self) -> Vec<Modification> {
        let previous = self.len();
        let modifications = self.tracker.redo(&mut self.list);
        tracing::debug!(count = modifications.len(), chunks = self.list.node_count(), "redo");
        self.notify(&modifications, ChangeOrigin::Redo, previous);
        modifications
    }

    pub fn begin_group(&mut self) {
        self.tracker.begin_group();
    }

    pub fn end_group(&mut self) {
        self.tracker.end_group();
    }

    /// Runs `edits` so that everything they change undoes in one step.
    pub fn group<R>(&mut self, edits: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_group();
        let result = edits(self);
        self.end_group();
        result
    }

    pub fn is_history_enabled(&self) -> bool {
        self.tracker.is_enabled()
    }

    /// Disabling history discards every undo and redo step.
    pub fn set_history_enabled(&mut self, enabled: bool) {
        self.tracker.set_enabled(enabled);
    }

    fn check_offset(&self, offset: usize) {
        assert!(
            offset <= self.len(),
            "offset {offset} past end of buffer ({})",
            self.len()
        );
    }

    fn commit(&mut self, collection: ChangeCollection, previous: usize) {
        let modification = collection.modification().clone();
        tracing::debug!(
            ?modification,
            changes = collection.changes().len(),
            chunks = self.list.node_count(),
            len = self.len(),
            "edit"
        );
        self.tracker.record(collection);
        self.notify(std::slice::from_ref(&modification), ChangeOrigin::User, previous);
    }

    fn notify(&mut self, modifications: &[Modification], origin: ChangeOrigin, previous: usize) {
        if !self.events.has_subscribers() {
            return;
        }
        for modification in modifications {
            self.events.send(BufferEvent::Modified {
                modification: modification.clone(),
                origin,
            });
        }
        let current = self.len();
        if current != previous {
            self.events.send(BufferEvent::LengthChanged { previous, current });
        }
    }
}
