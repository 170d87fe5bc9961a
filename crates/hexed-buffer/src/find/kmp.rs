//! Knuth-Morris-Pratt matcher usable in both directions.

use super::{Cancelled, Direction};
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;

/// Random-access byte source searched by [`Kmp`].
pub trait Haystack {
    fn len(&self) -> usize;

    fn byte_at(&mut self, index: usize) -> u8;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Haystack for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn byte_at(&mut self, index: usize) -> u8 {
        self[index]
    }
}

/// KMP searcher for one pattern.
///
/// Failure tables are built on first use, one per direction. The backward
/// table is the forward construction run over mirrored pattern indices.
#[derive(Debug)]
pub struct Kmp {
    pattern: Vec<u8>,
    forward: OnceLock<Vec<usize>>,
    backward: OnceLock<Vec<usize>>,
    poll_interval: usize,
}

impl Kmp {
    pub const DEFAULT_POLL_INTERVAL: usize = 100;

    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        Self {
            pattern: pattern.into(),
            forward: OnceLock::new(),
            backward: OnceLock::new(),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Number of haystack bytes examined between cancellation checks.
    pub fn with_poll_interval(mut self, interval: usize) -> Self {
        self.poll_interval = interval.max(1);
        self
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn poll_interval(&self) -> usize {
        self.poll_interval
    }

    #[inline]
    fn at(&self, direction: Direction, index: usize) -> u8 {
        match direction {
            Direction::Forward => self.pattern[index],
            Direction::Backward => self.pattern[self.pattern.len() - 1 - index],
        }
    }

    fn failure(&self, direction: Direction) -> &[usize] {
        let cell = match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        };
        cell.get_or_init(|| self.build_failure(direction))
    }

    fn build_failure(&self, direction: Direction) -> Vec<usize> {
        let m = self.pattern.len();
        let mut table = vec![0usize; m];
        let mut k = 0;
        for i in 1..m {
            while k > 0 && self.at(direction, i) != self.at(direction, k) {
                k = table[k - 1];
            }
            if self.at(direction, i) == self.at(direction, k) {
                k += 1;
            }
            table[i] = k;
        }
        table
    }

    /// First match fully inside `[start, start + max_len)`.
    pub fn find_forward<H: Haystack + ?Sized>(
        &self,
        haystack: &mut H,
        start: usize,
        max_len: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<usize>, Cancelled> {
        let m = self.pattern.len();
        let end = haystack.len().min(start.saturating_add(max_len));
        if m == 0 || start >= end || end - start < m {
            return Ok(None);
        }

        let failure = self.failure(Direction::Forward);
        let mut matched = 0;
        for (step, i) in (start..end).enumerate() {
            if step % self.poll_interval == 0 && cancel.is_cancelled() {
                return Err(Cancelled);
            }
            let byte = haystack.byte_at(i);
            while matched > 0 && byte != self.pattern[matched] {
                matched = failure[matched - 1];
            }
            if byte == self.pattern[matched] {
                matched += 1;
            }
            if matched == m {
                return Ok(Some(i + 1 - m));
            }
        }
        Ok(None)
    }

    /// Last match fully inside `[end - max_len, end)`.
    pub fn find_backward<H: Haystack + ?Sized>(
        &self,
        haystack: &mut H,
        end: usize,
        max_len: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<usize>, Cancelled> {
        let m = self.pattern.len();
        let end = end.min(haystack.len());
        let begin = end.saturating_sub(max_len);
        if m == 0 || end - begin < m {
            return Ok(None);
        }

        let failure = self.failure(Direction::Backward);
        let mut matched = 0;
        for (step, i) in (begin..end).rev().enumerate() {
            if step % self.poll_interval == 0 && cancel.is_cancelled() {
                return Err(Cancelled);
            }
            let byte = haystack.byte_at(i);
            while matched > 0 && byte != self.at(Direction::Backward, matched) {
                matched = failure[matched - 1];
            }
            if byte == self.at(Direction::Backward, matched) {
                matched += 1;
            }
            if matched == m {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    pub fn find<H: Haystack + ?Sized>(
        &self,
        haystack: &mut H,
        direction: Direction,
        window: std::ops::Range<usize>,
        cancel: &CancellationToken,
    ) -> Result<Option<usize>, Cancelled> {
        let len = window.end.saturating_sub(window.start);
        match direction {
            Direction::Forward => self.find_forward(haystack, window.start, len, cancel),
            Direction::Backward => self.find_backward(haystack, window.end, len, cancel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text() -> Vec<u8> {
        let mut bytes: Vec<u8> = (0..200u32).map(|i| (i * 7 % 251) as u8).collect();
        bytes[120..125].copy_from_slice(b"hexed");
        bytes
    }

    #[test]
    fn finds_known_index_in_both_directions() {
        let bytes = text();
        let kmp = Kmp::new(b"hexed".to_vec());
        let cancel = CancellationToken::new();
        let mut hay = bytes.as_slice();

        assert_eq!(
            kmp.find_forward(&mut hay, 0, bytes.len(), &cancel),
            Ok(Some(120))
        );
        assert_eq!(
            kmp.find_backward(&mut hay, bytes.len(), bytes.len(), &cancel),
            Ok(Some(120))
        );
    }

    #[test]
    fn max_len_short_of_match_is_not_found() {
        let bytes = text();
        let kmp = Kmp::new(b"hexed".to_vec());
        let cancel = CancellationToken::new();
        let mut hay = bytes.as_slice();

        assert_eq!(kmp.find_forward(&mut hay, 0, 124, &cancel), Ok(None));
        assert_eq!(kmp.find_forward(&mut hay, 0, 125, &cancel), Ok(Some(120)));
        assert_eq!(kmp.find_backward(&mut hay, 200, 79, &cancel), Ok(None));
        assert_eq!(kmp.find_backward(&mut hay, 200, 80, &cancel), Ok(Some(120)));
    }

    #[test]
    fn overlapping_matches_pick_nearest_per_direction() {
        let kmp = Kmp::new(b"aa".to_vec());
        let cancel = CancellationToken::new();
        let mut hay: &[u8] = b"xaaaax";

        assert_eq!(kmp.find_forward(&mut hay, 0, 6, &cancel), Ok(Some(1)));
        assert_eq!(kmp.find_backward(&mut hay, 6, 6, &cancel), Ok(Some(3)));
        assert_eq!(kmp.find_forward(&mut hay, 2, 4, &cancel), Ok(Some(2)));
    }

    #[test]
    fn asymmetric_pattern_uses_mirrored_table() {
        // Forward and backward failure tables differ for this pattern.
        let kmp = Kmp::new(b"abab c".to_vec());
        let cancel = CancellationToken::new();
        let mut hay: &[u8] = b"abab abab cabab c";

        assert_eq!(kmp.find_forward(&mut hay, 0, 17, &cancel), Ok(Some(5)));
        assert_eq!(kmp.find_backward(&mut hay, 17, 17, &cancel), Ok(Some(11)));
        assert_ne!(
            kmp.failure(Direction::Forward),
            kmp.failure(Direction::Backward)
        );
    }

    #[test]
    fn failure_table_matches_textbook() {
        let kmp = Kmp::new(b"ababaca".to_vec());
        assert_eq!(kmp.failure(Direction::Forward), &[0, 0, 1, 2, 3, 0, 1]);
    }

    #[test]
    fn empty_pattern_and_short_haystack() {
        let cancel = CancellationToken::new();
        let mut hay: &[u8] = b"abc";
        assert_eq!(Kmp::new(Vec::new()).find_forward(&mut hay, 0, 3, &cancel), Ok(None));
        assert_eq!(
            Kmp::new(b"abcd".to_vec()).find_backward(&mut hay, 3, 3, &cancel),
            Ok(None)
        );
    }

    #[test]
    fn cancelled_token_stops_search() {
        let kmp = Kmp::new(b"zz".to_vec()).with_poll_interval(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut hay: &[u8] = b"aaaaaaaa";
        assert_eq!(kmp.find_forward(&mut hay, 0, 8, &cancel), Err(Cancelled));
        assert_eq!(kmp.find_backward(&mut hay, 8, 8, &cancel), Err(Cancelled));
    }
}
