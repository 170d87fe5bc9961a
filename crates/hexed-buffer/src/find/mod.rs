//! Pattern search over mapped files, byte slices and chunk lists.

pub mod kmp;
pub mod window;

pub use kmp::{Haystack, Kmp};
pub use window::ChunkWindow;

use crate::list::ChunkList;
use crate::pool::ScratchPool;
use memmap2::Mmap;
use std::ops::Range;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// A search stopped because its cancellation token fired.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("search cancelled")]
pub struct Cancelled;

/// Searches `window` of a flat byte array.
pub fn find_in_slice(
    kmp: &Kmp,
    haystack: &[u8],
    direction: Direction,
    window: Range<usize>,
    cancel: &CancellationToken,
) -> Result<Option<usize>, Cancelled> {
    if let [needle] = kmp.pattern() {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        let end = window.end.min(haystack.len());
        let start = window.start.min(end);
        let bytes = &haystack[start..end];
        let found = match direction {
            Direction::Forward => memchr::memchr(*needle, bytes),
            Direction::Backward => memchr::memrchr(*needle, bytes),
        };
        return Ok(found.map(|index| start + index));
    }
    let mut hay = haystack;
    kmp.find(&mut hay, direction, window, cancel)
}

/// Searches `window` of a mapped file view.
pub fn find_in_mapped(
    kmp: &Kmp,
    map: &Mmap,
    direction: Direction,
    window: Range<usize>,
    cancel: &CancellationToken,
) -> Result<Option<usize>, Cancelled> {
    find_in_slice(kmp, &map[..], direction, window, cancel)
}

/// Searches `window` of the logical content of a chunk list through a
/// [`ChunkWindow`] backed by a pooled buffer.
pub fn find_in_chunks(
    kmp: &Kmp,
    list: &ChunkList,
    pool: &ScratchPool,
    direction: Direction,
    window: Range<usize>,
    cancel: &CancellationToken,
) -> Result<Option<usize>, Cancelled> {
    let mut reader = ChunkWindow::new(list, pool.get(), direction);
    let found = kmp.find(&mut reader, direction, window, cancel);
    tracing::trace!(refills = reader.refills(), ?found, "chunk window search");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::source::Source;
    use hexed_config::OpenMode;
    use std::sync::Arc;

    #[test]
    fn single_byte_patterns_use_the_window() {
        let kmp = Kmp::new(vec![b'x']);
        let cancel = CancellationToken::new();
        let hay = b"ax--x--xa";
        assert_eq!(
            find_in_slice(&kmp, hay, Direction::Forward, 2..9, &cancel),
            Ok(Some(4))
        );
        assert_eq!(
            find_in_slice(&kmp, hay, Direction::Backward, 0..7, &cancel),
            Ok(Some(4))
        );
        assert_eq!(
            find_in_slice(&kmp, hay, Direction::Forward, 8..9, &cancel),
            Ok(None)
        );
    }

    #[test]
    fn chunk_search_crosses_chunk_boundaries() {
        let source = Arc::new(Source::from_bytes(b"....he".to_vec()));
        let mut list = ChunkList::new(Chunk::source(source, 0, 6));
        let tail = list.tail();
        list.insert_after(tail, Chunk::memory(b"xed..".to_vec()));

        let kmp = Kmp::new(b"hexed".to_vec());
        let pool = ScratchPool::new(3, 2);
        let cancel = CancellationToken::new();
        let len = list.len_bytes();

        assert_eq!(
            find_in_chunks(&kmp, &list, &pool, Direction::Forward, 0..len, &cancel),
            Ok(Some(4))
        );
        assert_eq!(
            find_in_chunks(&kmp, &list, &pool, Direction::Backward, 0..len, &cancel),
            Ok(Some(4))
        );
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn mapped_file_search() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapped.bin");
        let mut bytes = vec![0u8; 4096];
        bytes[3000..3004].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        std::fs::write(&path, &bytes).unwrap();

        let source = Source::open(&path, OpenMode::ReadOnly).unwrap();
        let map = source.mapped().unwrap();
        let kmp = Kmp::new(vec![0xde, 0xad, 0xbe, 0xef]);
        let cancel = CancellationToken::new();
        assert_eq!(
            find_in_mapped(&kmp, map, Direction::Backward, 0..4096, &cancel),
            Ok(Some(3000))
        );
        assert_eq!(
            find_in_mapped(&kmp, map, Direction::Forward, 3001..4096, &cancel),
            Ok(None)
        );
    }
}
