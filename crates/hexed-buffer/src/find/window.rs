use super::Direction;
use super::kmp::Haystack;
use crate::list::ChunkList;
use crate::pool::ScratchBuffer;

/// Single-entry read cache presenting a chunk list as a [`Haystack`].
///
/// The window is refilled only when a requested index leaves it. Forward
/// scans refill starting at the requested index, backward scans ending at it.
pub struct ChunkWindow<'a> {
    list: &'a ChunkList,
    buffer: ScratchBuffer<'a>,
    direction: Direction,
    start: usize,
    filled: usize,
    refills: usize,
}

impl<'a> ChunkWindow<'a> {
    pub fn new(list: &'a ChunkList, buffer: ScratchBuffer<'a>, direction: Direction) -> Self {
        Self {
            list,
            buffer,
            direction,
            start: 0,
            filled: 0,
            refills: 0,
        }
    }

    /// How many times the window has been re-read from the list.
    pub fn refills(&self) -> usize {
        self.refills
    }

    fn refill(&mut self, index: usize) {
        let capacity = self.buffer.len();
        self.start = match self.direction {
            Direction::Forward => index,
            Direction::Backward => (index + 1).saturating_sub(capacity),
        };
        self.filled = self.list.read(self.start, &mut self.buffer);
        self.refills += 1;
    }
}

impl Haystack for ChunkWindow<'_> {
    fn len(&self) -> usize {
        self.list.len_bytes()
    }

    fn byte_at(&mut self, index: usize) -> u8 {
        if index < self.start || index >= self.start + self.filled {
            self.refill(index);
        }
        self.buffer[index - self.start]
    }
}
