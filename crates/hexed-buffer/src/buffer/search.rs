use super::Buffer;
use crate::chunk::{Chunk, ChunkKind};
use crate::error::BufferResult;
use crate::find::{self, Cancelled, Direction, Kmp};
use crate::list::ChunkList;
use std::ops::Range;
use tokio_util::sync::CancellationToken;

/// Where and how [`Buffer::find`] searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindOptions {
    /// Forward: first accepted match start. Backward: last accepted match start.
    pub start: usize,
    pub direction: Direction,
    /// Continue from the opposite end once the initial direction is exhausted.
    pub wrap_around: bool,
}

impl FindOptions {
    pub fn forward(start: usize) -> Self {
        Self {
            start,
            direction: Direction::Forward,
            wrap_around: false,
        }
    }

    pub fn backward(start: usize) -> Self {
        Self {
            start,
            direction: Direction::Backward,
            wrap_around: false,
        }
    }

    pub fn wrapping(mut self) -> Self {
        self.wrap_around = true;
        self
    }
}

/// Maximal stretch of consecutive chunks of one kind, in logical offsets.
fn runs(list: &ChunkList) -> Vec<(ChunkKind, Range<usize>)> {
    let mut runs: Vec<(ChunkKind, Range<usize>)> = Vec::new();
    for (_, start, chunk) in list.spans() {
        let end = start + chunk.len();
        match runs.last_mut() {
            Some((kind, range)) if *kind == chunk.kind() => range.end = end,
            _ => runs.push((chunk.kind(), start..end)),
        }
    }
    runs
}

impl Buffer {
    /// Searches for `pattern` and returns the start offset of the match.
    ///
    /// A forward search returns the first match starting at or after
    /// `options.start`, a backward search the last match starting at or before
    /// it. `Ok(None)` means no match; cancellation is reported as an error.
    pub fn find(
        &self,
        pattern: &[u8],
        options: FindOptions,
        cancel: &CancellationToken,
    ) -> BufferResult<Option<usize>> {
        let len = self.len();
        if pattern.is_empty() || pattern.len() > len {
            return Ok(None);
        }
        // Exclusive bound on match starts.
        let starts_end = len - pattern.len() + 1;
        let kmp = Kmp::new(pattern).with_poll_interval(self.config.cancel_poll_interval);

        let (primary, wrapped) = match options.direction {
            Direction::Forward => {
                let from = options.start.min(starts_end);
                (from..starts_end, 0..from)
            }
            Direction::Backward => {
                let to = options.start.saturating_add(1).min(starts_end);
                (0..to, to..starts_end)
            }
        };

        if let Some(found) = self.find_starts(&kmp, primary, options.direction, cancel)? {
            return Ok(Some(found));
        }
        if !options.wrap_around {
            return Ok(None);
        }
        tracing::trace!(direction = ?options.direction, "find wrapped around");
        Ok(self.find_starts(&kmp, wrapped, options.direction, cancel)?)
    }

    /// Continues a search past the match at `previous`.
    pub fn find_next(
        &self,
        pattern: &[u8],
        previous: usize,
        direction: Direction,
        wrap_around: bool,
        cancel: &CancellationToken,
    ) -> BufferResult<Option<usize>> {
        let options = match direction {
            Direction::Forward => FindOptions::forward(previous.saturating_add(1)),
            Direction::Backward => match previous.checked_sub(1) {
                Some(start) => FindOptions::backward(start),
                None if wrap_around => FindOptions::backward(usize::MAX),
                None => return Ok(None),
            },
        };
        let options = FindOptions {
            wrap_around,
            ..options
        };
        self.find(pattern, options, cancel)
    }

    /// Nearest match in `direction` whose start lies in `starts`, searching
    /// one run of same-kind chunks at a time.
    fn find_starts(
        &self,
        kmp: &Kmp,
        starts: Range<usize>,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Result<Option<usize>, Cancelled> {
        if starts.is_empty() {
            return Ok(None);
        }
        let margin = kmp.pattern().len() - 1;
        let mut runs = runs(&self.list);
        if direction == Direction::Backward {
            runs.reverse();
        }

        for (_, run) in runs {
            let first = starts.start.max(run.start);
            let last = starts.end.min(run.end);
            if first >= last {
                continue;
            }
            let window = first..(last + margin).min(self.len());
            if let Some(found) = self.search_window(kmp, window, direction, cancel)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn search_window(
        &self,
        kmp: &Kmp,
        window: Range<usize>,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Result<Option<usize>, Cancelled> {
        let (node, node_start) = self.list.locate(window.start);
        let chunk = self.list.chunk(node);
        if window.end > node_start + chunk.len() {
            return find::find_in_chunks(kmp, &self.list, &self.pool, direction, window, cancel);
        }

        let local = window.start - node_start..window.end - node_start;
        let found = match chunk {
            Chunk::Memory(memory) => {
                find::find_in_slice(kmp, memory.as_slice(), direction, local, cancel)?
                    .map(|index| node_start + index)
            }
            Chunk::Source(source) => {
                let base = source.offset();
                let shifted = local.start + base..local.end + base;
                let hit = match source.source().mapped() {
                    Some(map) => find::find_in_mapped(kmp, map, direction, shifted, cancel)?,
                    None => find::find_in_slice(
                        kmp,
                        source.source().as_bytes(),
                        direction,
                        shifted,
                        cancel,
                    )?,
                };
                hit.map(|index| index - base + node_start)
            }
        };
        Ok(found)
    }
}
