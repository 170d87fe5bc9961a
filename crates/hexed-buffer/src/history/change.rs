use super::relocate::{self, Effect};
use crate::chunk::Chunk;
use crate::list::{ChunkList, NodeId};

/// In-place edit of a single chunk's content or window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentChange {
    /// Overwrite memory bytes starting at `offset` relative to the chunk
    /// start. A negative offset grows the chunk at the front; a write ending
    /// past the chunk grows it at the back.
    MemoryWrite {
        offset: isize,
        bytes: Vec<u8>,
        overwritten: Vec<u8>,
        grown_front: usize,
        grown_back: usize,
    },
    MemoryInsert {
        offset: usize,
        bytes: Vec<u8>,
    },
    MemoryRemove {
        offset: usize,
        len: usize,
        removed: Vec<u8>,
    },
    /// Re-point a source chunk at `[offset, offset + len)` of its source.
    SourceReframe {
        offset: usize,
        len: usize,
        previous: (usize, usize),
    },
}

impl ContentChange {
    pub fn memory_write(offset: isize, bytes: impl Into<Vec<u8>>) -> Self {
        ContentChange::MemoryWrite {
            offset,
            bytes: bytes.into(),
            overwritten: Vec::new(),
            grown_front: 0,
            grown_back: 0,
        }
    }

    pub fn memory_insert(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        ContentChange::MemoryInsert {
            offset,
            bytes: bytes.into(),
        }
    }

    pub fn memory_remove(offset: usize, len: usize) -> Self {
        ContentChange::MemoryRemove {
            offset,
            len,
            removed: Vec::new(),
        }
    }

    pub fn source_reframe(offset: usize, len: usize) -> Self {
        ContentChange::SourceReframe {
            offset,
            len,
            previous: (0, 0),
        }
    }

    pub(crate) fn apply(&mut self, chunk: &mut Chunk) {
        match self {
            ContentChange::MemoryWrite {
                offset,
                bytes,
                overwritten,
                grown_front,
                grown_back,
            } => {
                let data = memory_bytes(chunk);
                let old_len = data.len() as isize;
                let start = *offset;
                let end = start + bytes.len() as isize;

                let kept_start = start.max(0) as usize;
                let kept_end = end.min(old_len).max(start.max(0)) as usize;
                *overwritten = data[kept_start..kept_end].to_vec();
                *grown_front = (-start).max(0) as usize;
                *grown_back = (end - old_len).max(0) as usize;

                if *grown_front > 0 {
                    data.splice(0..0, std::iter::repeat_n(0u8, *grown_front));
                }
                data.resize(data.len() + *grown_back, 0);
                data[kept_start..kept_start + bytes.len()].copy_from_slice(bytes);
            }
            ContentChange::MemoryInsert { offset, bytes } => {
                let data = memory_bytes(chunk);
                data.splice(*offset..*offset, bytes.iter().copied());
            }
            ContentChange::MemoryRemove {
                offset,
                len,
                removed,
            } => {
                let data = memory_bytes(chunk);
                *removed = data.drain(*offset..*offset + *len).collect();
            }
            ContentChange::SourceReframe {
                offset,
                len,
                previous,
            } => {
                let source = source_chunk(chunk);
                *previous = (source.offset(), source.len());
                source.set_window(*offset, *len);
            }
        }
    }

    pub(crate) fn revert(&mut self, chunk: &mut Chunk) {
        match self {
            ContentChange::MemoryWrite {
                offset,
                overwritten,
                grown_front,
                grown_back,
                ..
            } => {
                let data = memory_bytes(chunk);
                let restored_len = data.len() - *grown_back;
                data.truncate(restored_len);
                data.drain(..*grown_front);
                let start = (*offset).max(0) as usize;
                data[start..start + overwritten.len()].copy_from_slice(overwritten);
            }
            ContentChange::MemoryInsert { offset, bytes } => {
                let data = memory_bytes(chunk);
                data.drain(*offset..*offset + bytes.len());
            }
            ContentChange::MemoryRemove {
                offset, removed, ..
            } => {
                let data = memory_bytes(chunk);
                data.splice(*offset..*offset, removed.iter().copied());
            }
            ContentChange::SourceReframe { previous, .. } => {
                let (offset, len) = *previous;
                source_chunk(chunk).set_window(offset, len);
            }
        }
    }
}

fn memory_bytes(chunk: &mut Chunk) -> &mut Vec<u8> {
    match chunk.as_memory_mut() {
        Some(memory) => memory.bytes_mut(),
        None => panic!("memory change applied to a source chunk"),
    }
}

fn source_chunk(chunk: &mut Chunk) -> &mut crate::chunk::SourceChunk {
    match chunk.as_source_mut() {
        Some(source) => source,
        None => panic!("source change applied to a memory chunk"),
    }
}

/// Edit of the list structure around a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyChange {
    /// Link a copy of `chunk` in front of the target.
    InsertBefore { chunk: Chunk },
    /// Link a copy of `chunk` behind the target.
    InsertAfter { chunk: Chunk },
    /// Unlink the target; `removed` holds its chunk while the change is applied.
    Remove {
        removed: Option<Chunk>,
        had_next: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Content(ContentChange),
    Topology(TopologyChange),
}

/// One reversible micro-mutation.
///
/// `hops` is how far the change's target lies from the context node left by
/// the previous change of the same collection (negative walks backwards).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub hops: isize,
    pub kind: ChangeKind,
}

impl Change {
    pub fn new(hops: isize, kind: ChangeKind) -> Self {
        Self { hops, kind }
    }

    pub fn content(hops: isize, change: ContentChange) -> Self {
        Self::new(hops, ChangeKind::Content(change))
    }

    pub fn insert_before(hops: isize, chunk: Chunk) -> Self {
        Self::new(hops, ChangeKind::Topology(TopologyChange::InsertBefore { chunk }))
    }

    pub fn insert_after(hops: isize, chunk: Chunk) -> Self {
        Self::new(hops, ChangeKind::Topology(TopologyChange::InsertAfter { chunk }))
    }

    pub fn remove(hops: isize) -> Self {
        Self::new(
            hops,
            ChangeKind::Topology(TopologyChange::Remove {
                removed: None,
                had_next: false,
            }),
        )
    }

    pub fn is_topology(&self) -> bool {
        matches!(self.kind, ChangeKind::Topology(_))
    }

    /// Applies the change after walking `hops` from `context`; returns the next context.
    pub(crate) fn apply(&mut self, list: &mut ChunkList, context: NodeId) -> NodeId {
        let target = relocate::target(&*list, context, self.hops);
        let effect = match &mut self.kind {
            ChangeKind::Content(change) => {
                list.update(target, |chunk| change.apply(chunk));
                Effect::Touched
            }
            ChangeKind::Topology(TopologyChange::InsertBefore { chunk }) => {
                Effect::Inserted(list.insert_before(target, chunk.clone()))
            }
            ChangeKind::Topology(TopologyChange::InsertAfter { chunk }) => {
                Effect::Inserted(list.insert_after(target, chunk.clone()))
            }
            ChangeKind::Topology(TopologyChange::Remove { removed, had_next }) => {
                let successor = list.next(target);
                let predecessor = list.prev(target);
                *had_next = successor.is_some();
                *removed = Some(list.remove(target));
                Effect::Removed {
                    successor,
                    predecessor,
                }
            }
        };
        relocate::settle(target, effect)
    }

    /// Reverts the change given the context it left behind; returns the context it started from.
    pub(crate) fn revert(&mut self, list: &mut ChunkList, context: NodeId) -> NodeId {
        let target = match &mut self.kind {
            ChangeKind::Content(change) => {
                list.update(context, |chunk| change.revert(chunk));
                context
            }
            ChangeKind::Topology(TopologyChange::InsertBefore { .. }) => {
                let target = match list.next(context) {
                    Some(target) => target,
                    None => panic!("inserted chunk lost its successor"),
                };
                list.remove(context);
                target
            }
            ChangeKind::Topology(TopologyChange::InsertAfter { .. }) => {
                let target = match list.prev(context) {
                    Some(target) => target,
                    None => panic!("inserted chunk lost its predecessor"),
                };
                list.remove(context);
                target
            }
            ChangeKind::Topology(TopologyChange::Remove { removed, had_next }) => {
                let chunk = match removed.take() {
                    Some(chunk) => chunk,
                    None => panic!("remove reverted without a captured chunk"),
                };
                if *had_next {
                    list.insert_before(context, chunk)
                } else {
                    list.insert_after(context, chunk)
                }
            }
        };
        relocate::origin(&*list, target, self.hops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use std::sync::Arc;

    fn apply_and_revert(chunk: Chunk, mut change: ContentChange) -> (Chunk, Chunk) {
        let mut edited = chunk.clone();
        change.apply(&mut edited);
        let mut restored = edited.clone();
        change.revert(&mut restored);
        (edited, restored)
    }

    #[test]
    fn memory_write_inside() {
        let original = Chunk::memory(vec![1, 2, 3, 4]);
        let (edited, restored) =
            apply_and_revert(original.clone(), ContentChange::memory_write(1, vec![9, 9]));
        assert_eq!(edited.as_slice(), &[1, 9, 9, 4]);
        assert_eq!(restored, original);
    }

    #[test]
    fn memory_write_grows_front_and_back() {
        let original = Chunk::memory(vec![1, 2]);
        let mut change = ContentChange::memory_write(-2, vec![7, 7, 7, 7, 7]);
        let mut edited = original.clone();
        change.apply(&mut edited);
        assert_eq!(edited.as_slice(), &[7, 7, 7, 7, 7]);
        match &change {
            ContentChange::MemoryWrite {
                overwritten,
                grown_front,
                grown_back,
                ..
            } => {
                assert_eq!(overwritten, &vec![1, 2]);
                assert_eq!(*grown_front, 2);
                assert_eq!(*grown_back, 1);
            }
            other => panic!("unexpected change {other:?}"),
        }
        change.revert(&mut edited);
        assert_eq!(edited, original);
    }

    #[test]
    fn memory_write_entirely_before_existing_bytes() {
        // Front growth that ends exactly where the old bytes begin overwrites nothing.
        let original = Chunk::memory(vec![5, 6]);
        let (edited, restored) =
            apply_and_revert(original.clone(), ContentChange::memory_write(-3, vec![1, 2, 3]));
        assert_eq!(edited.as_slice(), &[1, 2, 3, 5, 6]);
        assert_eq!(restored, original);
    }

    #[test]
    fn memory_write_appends_at_end() {
        let original = Chunk::memory(vec![1]);
        let (edited, restored) =
            apply_and_revert(original.clone(), ContentChange::memory_write(1, vec![2, 3]));
        assert_eq!(edited.as_slice(), &[1, 2, 3]);
        assert_eq!(restored, original);
    }

    #[test]
    fn memory_insert_and_remove_invert() {
        let original = Chunk::memory(vec![1, 2, 3]);
        let (edited, restored) =
            apply_and_revert(original.clone(), ContentChange::memory_insert(1, vec![8, 8]));
        assert_eq!(edited.as_slice(), &[1, 8, 8, 2, 3]);
        assert_eq!(restored, original);

        let (edited, restored) =
            apply_and_revert(original.clone(), ContentChange::memory_remove(0, 2));
        assert_eq!(edited.as_slice(), &[3]);
        assert_eq!(restored, original);
    }

    #[test]
    fn source_reframe_restores_window() {
        let source = Arc::new(Source::from_bytes(vec![0u8; 64]));
        let original = Chunk::source(source, 8, 32);
        let (edited, restored) =
            apply_and_revert(original.clone(), ContentChange::source_reframe(10, 4));
        assert_eq!(edited.as_source().unwrap().offset(), 10);
        assert_eq!(edited.len(), 4);
        assert_eq!(restored, original);
    }

    #[test]
    #[should_panic(expected = "memory change applied to a source chunk")]
    fn memory_change_on_source_chunk_panics() {
        let source = Arc::new(Source::from_bytes(vec![0u8; 4]));
        let mut chunk = Chunk::source(source, 0, 4);
        ContentChange::memory_insert(0, vec![1]).apply(&mut chunk);
    }

    #[test]
    fn topology_changes_round_trip_through_the_list() {
        let mut list = ChunkList::new(Chunk::memory(vec![1]));
        let head = list.head();

        let mut insert = Change::insert_after(0, Chunk::memory(vec![2]));
        let context = insert.apply(&mut list, head);
        assert_ne!(context, head);
        assert_eq!(list.len_bytes(), 2);

        let mut remove = Change::remove(-1);
        let context = remove.apply(&mut list, context);
        assert_eq!(list.chunk(context).as_slice(), &[2]);
        assert_eq!(list.node_count(), 1);

        let context = remove.revert(&mut list, context);
        assert_eq!(list.node_count(), 2);
        let context = insert.revert(&mut list, context);
        assert_eq!(list.node_count(), 1);
        assert_eq!(list.chunk(context).as_slice(), &[1]);
    }
}
