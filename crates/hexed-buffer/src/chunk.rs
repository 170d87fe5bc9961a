use crate::source::Source;
use std::fmt;
use std::sync::Arc;

/// Kind tag for a [`Chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    Source,
    Memory,
}

/// A window onto the shared backing source.
///
/// Only the window moves; the source bytes are never written.
#[derive(Clone)]
pub struct SourceChunk {
    source: Arc<Source>,
    offset: usize,
    len: usize,
}

impl SourceChunk {
    pub fn new(source: Arc<Source>, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= source.len(),
            "source chunk window out of bounds"
        );
        Self {
            source,
            offset,
            len,
        }
    }

    /// Offset of the window inside the backing source.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.source.as_bytes()[self.offset..self.offset + self.len]
    }

    pub(crate) fn set_window(&mut self, offset: usize, len: usize) {
        assert!(
            offset + len <= self.source.len(),
            "source chunk window out of bounds"
        );
        self.offset = offset;
        self.len = len;
    }
}

impl fmt::Debug for SourceChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceChunk")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

impl PartialEq for SourceChunk {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
            && self.offset == other.offset
            && self.len == other.len
    }
}

impl Eq for SourceChunk {}

/// Owned bytes holding edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryChunk {
    bytes: Vec<u8>,
}

impl MemoryChunk {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }
}

/// A contiguous run of logical buffer bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Source(SourceChunk),
    Memory(MemoryChunk),
}

impl Chunk {
    pub fn memory(bytes: impl Into<Vec<u8>>) -> Self {
        Chunk::Memory(MemoryChunk::new(bytes))
    }

    pub fn source(source: Arc<Source>, offset: usize, len: usize) -> Self {
        Chunk::Source(SourceChunk::new(source, offset, len))
    }

    pub fn kind(&self) -> ChunkKind {
        match self {
            Chunk::Source(_) => ChunkKind::Source,
            Chunk::Memory(_) => ChunkKind::Memory,
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Chunk::Memory(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Chunk::Source(chunk) => chunk.len(),
            Chunk::Memory(chunk) => chunk.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All bytes of the chunk as one slice.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Chunk::Source(chunk) => chunk.as_slice(),
            Chunk::Memory(chunk) => chunk.as_slice(),
        }
    }

    /// Copies bytes from `[relative_offset, len)` into `dest`, returning the count copied.
    pub fn read(&self, dest: &mut [u8], relative_offset: usize) -> usize {
        let bytes = self.as_slice();
        assert!(relative_offset <= bytes.len(), "chunk read out of bounds");
        let count = dest.len().min(bytes.len() - relative_offset);
        dest[..count].copy_from_slice(&bytes[relative_offset..relative_offset + count]);
        count
    }

    pub fn as_memory(&self) -> Option<&MemoryChunk> {
        match self {
            Chunk::Memory(chunk) => Some(chunk),
            Chunk::Source(_) => None,
        }
    }

    pub fn as_source(&self) -> Option<&SourceChunk> {
        match self {
            Chunk::Source(chunk) => Some(chunk),
            Chunk::Memory(_) => None,
        }
    }

    pub(crate) fn as_memory_mut(&mut self) -> Option<&mut MemoryChunk> {
        match self {
            Chunk::Memory(chunk) => Some(chunk),
            Chunk::Source(_) => None,
        }
    }

    pub(crate) fn as_source_mut(&mut self) -> Option<&mut SourceChunk> {
        match self {
            Chunk::Source(chunk) => Some(chunk),
            Chunk::Memory(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Arc<Source> {
        Arc::new(Source::from_bytes((0u8..32).collect::<Vec<_>>()))
    }

    #[test]
    fn source_chunk_reads_its_window() {
        let chunk = Chunk::source(source(), 10, 5);
        let mut dest = [0u8; 8];
        assert_eq!(chunk.read(&mut dest, 2), 3);
        assert_eq!(&dest[..3], &[12, 13, 14]);
        assert_eq!(chunk.read(&mut dest, 5), 0);
        assert_eq!(chunk.kind(), ChunkKind::Source);
    }

    #[test]
    fn memory_chunk_reads_bounded() {
        let chunk = Chunk::memory(vec![9, 8, 7]);
        let mut dest = [0u8; 2];
        assert_eq!(chunk.read(&mut dest, 0), 2);
        assert_eq!(dest, [9, 8]);
        assert!(chunk.is_memory());
    }

    #[test]
    #[should_panic(expected = "chunk read out of bounds")]
    fn read_past_end_panics() {
        let chunk = Chunk::memory(vec![1]);
        chunk.read(&mut [0u8; 1], 2);
    }

    #[test]
    fn cloned_memory_chunk_is_independent() {
        let mut original = Chunk::memory(vec![1, 2, 3]);
        let snapshot = original.clone();
        original.as_memory_mut().unwrap().bytes_mut().push(4);
        assert_eq!(snapshot.as_slice(), &[1, 2, 3]);
        assert_eq!(original.len(), 4);
    }

    #[test]
    fn cloned_source_chunk_keeps_its_window() {
        let mut original = Chunk::source(source(), 0, 16);
        let snapshot = original.clone();
        original.as_source_mut().unwrap().set_window(4, 2);
        assert_eq!(snapshot.as_source().unwrap().offset(), 0);
        assert_eq!(snapshot.len(), 16);
        assert_eq!(original.as_slice(), &[4, 5]);
    }

    #[test]
    fn source_chunks_compare_by_window_and_source() {
        let shared = source();
        let a = Chunk::source(shared.clone(), 1, 2);
        let b = Chunk::source(shared, 1, 2);
        let c = Chunk::source(source(), 1, 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
