//! Translation of write, insert and delete calls into recorded changes.
//!
//! Every structural step goes through [`Recorder`], which applies a change to
//! the list and keeps it, so the recorded collection replays exactly what
//! happened here.

use crate::chunk::{Chunk, SourceChunk};
use crate::event::Modification;
use crate::history::relocate;
use crate::history::tracker::locate_context;
use crate::history::{Change, ChangeCollection, ChangeKind, ContentChange, TopologyChange};
use crate::list::{ChunkList, NodeId};

struct Recorder<'a> {
    list: &'a mut ChunkList,
    context: NodeId,
    change_offset: usize,
    start_at_previous: bool,
    changes: Vec<Change>,
}

impl<'a> Recorder<'a> {
    fn new(list: &'a mut ChunkList, change_offset: usize, start_at_previous: bool) -> Self {
        let context = locate_context(list, change_offset, start_at_previous);
        Self {
            list,
            context,
            change_offset,
            start_at_previous,
            changes: Vec::new(),
        }
    }

    fn push(&mut self, target: NodeId, kind: ChangeKind) -> NodeId {
        let hops = relocate::distance(&*self.list, self.context, target);
        let mut change = Change::new(hops, kind);
        self.context = change.apply(self.list, self.context);
        self.changes.push(change);
        self.context
    }

    fn content(&mut self, target: NodeId, change: ContentChange) {
        self.push(target, ChangeKind::Content(change));
    }

    fn insert_before(&mut self, anchor: NodeId, chunk: Chunk) -> NodeId {
        self.push(anchor, ChangeKind::Topology(TopologyChange::InsertBefore { chunk }))
    }

    fn insert_after(&mut self, anchor: NodeId, chunk: Chunk) -> NodeId {
        self.push(anchor, ChangeKind::Topology(TopologyChange::InsertAfter { chunk }))
    }

    fn remove(&mut self, target: NodeId) {
        self.push(
            target,
            ChangeKind::Topology(TopologyChange::Remove {
                removed: None,
                had_next: false,
            }),
        );
    }

    fn reframe(&mut self, target: NodeId, offset: usize, len: usize) {
        self.content(target, ContentChange::source_reframe(offset, len));
    }

    /// Drops `count` bytes from the front of a chunk that is longer than `count`.
    fn shrink_front(&mut self, target: NodeId, count: usize) {
        match self.list.chunk(target) {
            Chunk::Source(source) => {
                let (offset, len) = (source.offset(), source.len());
                self.reframe(target, offset + count, len - count);
            }
            Chunk::Memory(_) => self.content(target, ContentChange::memory_remove(0, count)),
        }
    }

    /// Drops `count` bytes from the back of a chunk that is longer than `count`.
    fn shrink_back(&mut self, target: NodeId, count: usize) {
        match self.list.chunk(target) {
            Chunk::Source(source) => {
                let (offset, len) = (source.offset(), source.len());
                self.reframe(target, offset, len - count);
            }
            Chunk::Memory(memory) => {
                let len = memory.len();
                self.content(target, ContentChange::memory_remove(len - count, count));
            }
        }
    }

    /// Removes `count` bytes starting at the front of `node`, walking forward.
    /// Stops early at the end of the document.
    fn trim_from(&mut self, node: NodeId, count: usize) {
        let mut current = Some(node);
        let mut remaining = count;
        while remaining > 0 {
            let Some(id) = current else { break };
            let len = self.list.chunk(id).len();
            if len == 0 {
                break;
            }
            if len > remaining {
                self.shrink_front(id, remaining);
                break;
            }
            if self.list.node_count() == 1 {
                tracing::warn!("deletion empties the buffer, linking an empty chunk");
                self.insert_after(id, Chunk::memory(Vec::new()));
            }
            current = self.list.next(id);
            self.remove(id);
            remaining -= len;
        }
    }

    /// Removes `count` bytes ending at the back of `node`, walking backward.
    fn trim_until(&mut self, node: NodeId, count: usize) {
        let mut current = Some(node);
        let mut remaining = count;
        while remaining > 0 {
            let Some(id) = current else { break };
            let len = self.list.chunk(id).len();
            if len == 0 {
                break;
            }
            if len > remaining {
                self.shrink_back(id, remaining);
                break;
            }
            current = self.list.prev(id);
            self.remove(id);
            remaining -= len;
        }
    }

    fn trim_after(&mut self, anchor: NodeId, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(next) = self.list.next(anchor) {
            self.trim_from(next, count);
        }
    }

    fn trim_before(&mut self, anchor: NodeId, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(prev) = self.list.prev(anchor) {
            self.trim_until(prev, count);
        }
    }

    fn finish(self, modification: Modification, inverse: Vec<Modification>) -> ChangeCollection {
        let end_offset = self.list.start_of(self.context);
        ChangeCollection::new(
            modification,
            inverse,
            self.change_offset,
            self.start_at_previous,
            end_offset,
            self.changes,
        )
    }
}

fn read_range(list: &ChunkList, offset: usize, len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    let copied = list.read(offset, &mut bytes);
    bytes.truncate(copied);
    bytes
}

fn previous_memory(list: &ChunkList, node: NodeId) -> Option<(NodeId, usize)> {
    let prev = list.prev(node)?;
    list.chunk(prev).as_memory().map(|memory| (prev, memory.len()))
}

/// First memory chunk after `node` that starts before `end`, with its start offset.
fn following_memory(list: &ChunkList, node: NodeId, node_end: usize, end: usize) -> Option<(NodeId, usize)> {
    let mut start = node_end;
    let mut current = list.next(node);
    while let Some(id) = current {
        if start >= end {
            return None;
        }
        let chunk = list.chunk(id);
        if chunk.is_memory() {
            return Some((id, start));
        }
        start += chunk.len();
        current = list.next(id);
    }
    None
}

fn source_window(list: &ChunkList, node: NodeId) -> SourceChunk {
    match list.chunk(node) {
        Chunk::Source(source) => source.clone(),
        Chunk::Memory(_) => panic!("expected a source chunk"),
    }
}

/// Overwrites `bytes` at `offset`, extending the buffer when the write runs past its end.
pub(crate) fn write(list: &mut ChunkList, offset: usize, bytes: &[u8]) -> ChangeCollection {
    let len = list.len_bytes();
    let count = bytes.len();
    let end = offset + count;

    let overwritten = read_range(list, offset, count.min(len - offset));
    let extension = end.saturating_sub(len);
    let mut inverse = Vec::new();
    if extension > 0 {
        inverse.push(Modification::Delete {
            offset: len,
            len: extension,
        });
    }
    if !overwritten.is_empty() {
        inverse.push(Modification::Write {
            offset,
            bytes: overwritten,
        });
    }
    let modification = Modification::Write {
        offset,
        bytes: bytes.to_vec(),
    };

    let (node, node_start) = list.locate(offset);
    let relative = offset - node_start;
    let node_len = list.chunk(node).len();

    // Memory chunks that can absorb the bytes in place, in order of preference.
    let host = if list.chunk(node).is_memory() {
        Some((node, relative as isize, node_len, offset, false))
    } else if let Some((prev, prev_len)) = previous_memory(list, node).filter(|_| relative == 0) {
        Some((prev, prev_len as isize, prev_len, offset, true))
    } else {
        following_memory(list, node, node_start + node_len, end).map(|(next, next_start)| {
            let next_len = list.chunk(next).len();
            (
                next,
                offset as isize - next_start as isize,
                next_len,
                next_start,
                false,
            )
        })
    };

    if let Some((host, host_offset, host_len, change_offset, at_previous)) = host {
        let front = (-host_offset).max(0) as usize;
        let back = (host_offset + count as isize - host_len as isize).max(0) as usize;
        let mut recorder = Recorder::new(list, change_offset, at_previous);
        recorder.content(host, ContentChange::memory_write(host_offset, bytes.to_vec()));
        recorder.trim_before(host, front);
        recorder.trim_after(host, back);
        return recorder.finish(modification, inverse);
    }

    let mut recorder = Recorder::new(list, offset, false);
    if relative == 0 {
        let inserted = recorder.insert_before(node, Chunk::memory(bytes.to_vec()));
        recorder.trim_after(inserted, count);
        return recorder.finish(modification, inverse);
    }

    let source = source_window(recorder.list, node);
    if relative < node_len {
        recorder.reframe(node, source.offset(), relative);
    }
    let inserted = recorder.insert_after(node, Chunk::memory(bytes.to_vec()));
    if relative + count < node_len {
        let suffix = Chunk::source(
            source.source().clone(),
            source.offset() + relative + count,
            node_len - relative - count,
        );
        recorder.insert_after(inserted, suffix);
    } else {
        recorder.trim_after(inserted, relative + count - node_len);
    }
    recorder.finish(modification, inverse)
}

/// Inserts `bytes` at `offset`, shifting everything after it.
pub(crate) fn insert(list: &mut ChunkList, offset: usize, bytes: &[u8]) -> ChangeCollection {
    let modification = Modification::Insert {
        offset,
        bytes: bytes.to_vec(),
    };
    let inverse = vec![Modification::Delete {
        offset,
        len: bytes.len(),
    }];

    let (node, node_start) = list.locate(offset);
    let relative = offset - node_start;
    let node_len = list.chunk(node).len();

    if relative == 0
        && let Some((prev, prev_len)) = previous_memory(list, node)
    {
        let mut recorder = Recorder::new(list, offset, true);
        recorder.content(prev, ContentChange::memory_insert(prev_len, bytes.to_vec()));
        return recorder.finish(modification, inverse);
    }

    let mut recorder = Recorder::new(list, offset, false);
    if recorder.list.chunk(node).is_memory() {
        recorder.content(node, ContentChange::memory_insert(relative, bytes.to_vec()));
    } else if relative == 0 {
        recorder.insert_before(node, Chunk::memory(bytes.to_vec()));
    } else if relative == node_len {
        recorder.insert_after(node, Chunk::memory(bytes.to_vec()));
    } else {
        let source = source_window(recorder.list, node);
        recorder.reframe(node, source.offset(), relative);
        let inserted = recorder.insert_after(node, Chunk::memory(bytes.to_vec()));
        let suffix = Chunk::source(
            source.source().clone(),
            source.offset() + relative,
            node_len - relative,
        );
        recorder.insert_after(inserted, suffix);
    }
    recorder.finish(modification, inverse)
}

/// Removes `count` bytes starting at `offset`.
pub(crate) fn delete(list: &mut ChunkList, offset: usize, count: usize) -> ChangeCollection {
    let modification = Modification::Delete { offset, len: count };
    let inverse = vec![Modification::Insert {
        offset,
        bytes: read_range(list, offset, count),
    }];

    let (node, node_start) = list.locate(offset);
    let relative = offset - node_start;
    let node_len = list.chunk(node).len();

    let mut recorder = Recorder::new(list, offset, false);
    if relative > 0 && relative + count < node_len {
        match recorder.list.chunk(node) {
            Chunk::Memory(_) => {
                recorder.content(node, ContentChange::memory_remove(relative, count));
            }
            Chunk::Source(source) => {
                let source = source.clone();
                recorder.reframe(node, source.offset(), relative);
                let suffix = Chunk::source(
                    source.source().clone(),
                    source.offset() + relative + count,
                    node_len - relative - count,
                );
                recorder.insert_after(node, suffix);
            }
        }
    } else if relative > 0 {
        let tail = node_len - relative;
        recorder.shrink_back(node, tail);
        recorder.trim_after(node, count - tail);
    } else {
        recorder.trim_from(node, count);
    }
    recorder.finish(modification, inverse)
}
