// Property-based tests for the editing engine
//
// A shadow Vec<u8> receives the same edits as the buffer. After every edit the
// buffer must match it byte for byte and its length must equal the sum of its
// chunk lengths. Undoing everything must restore every intermediate chunk
// layout exactly; redoing must replay them.

use hexed_buffer::{Buffer, CancellationToken, Chunk, ChunkKind, FindOptions};
use proptest::prelude::*;

/// Buffer edits with positions scaled to the current length
#[derive(Debug, Clone)]
enum EditOp {
    Write { offset_percent: u8, content: Vec<u8> },
    Insert { offset_percent: u8, content: Vec<u8> },
    Delete { offset_percent: u8, len_percent: u8 },
    /// Write starting at the very end, extending the buffer
    Append { content: Vec<u8> },
}

fn scaled(total: usize, percent: u8) -> usize {
    total * percent as usize / 255
}

impl EditOp {
    /// Resolves the op against a buffer of `total` bytes; `None` when it would be a no-op.
    fn resolve(&self, total: usize) -> Option<Resolved> {
        match self {
            Self::Write {
                offset_percent,
                content,
            } if !content.is_empty() => Some(Resolved::Write(
                scaled(total, *offset_percent),
                content.clone(),
            )),
            Self::Insert {
                offset_percent,
                content,
            } if !content.is_empty() => Some(Resolved::Insert(
                scaled(total, *offset_percent),
                content.clone(),
            )),
            Self::Delete {
                offset_percent,
                len_percent,
            } if total > 0 => {
                let offset = scaled(total, *offset_percent).min(total - 1);
                let max_len = total - offset;
                let len = scaled(max_len, *len_percent).clamp(1, max_len);
                Some(Resolved::Delete(offset, len))
            }
            Self::Append { content } if !content.is_empty() => {
                Some(Resolved::Write(total, content.clone()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Resolved {
    Write(usize, Vec<u8>),
    Insert(usize, Vec<u8>),
    Delete(usize, usize),
}

impl Resolved {
    fn apply(&self, buffer: &mut Buffer) {
        match self {
            Self::Write(offset, bytes) => buffer.write(*offset, bytes),
            Self::Insert(offset, bytes) => buffer.insert(*offset, bytes),
            Self::Delete(offset, len) => buffer.delete(*offset, *len),
        }
    }

    fn apply_to_shadow(&self, shadow: &mut Vec<u8>) {
        match self {
            Self::Write(offset, bytes) => {
                let end = offset + bytes.len();
                if end > shadow.len() {
                    shadow.resize(end, 0);
                }
                shadow[*offset..end].copy_from_slice(bytes);
            }
            Self::Insert(offset, bytes) => {
                shadow.splice(*offset..*offset, bytes.iter().copied());
            }
            Self::Delete(offset, len) => {
                shadow.drain(*offset..*offset + *len);
            }
        }
    }
}

fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..24)
}

fn edit_op() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        3 => (any::<u8>(), content_strategy())
            .prop_map(|(offset_percent, content)| EditOp::Write { offset_percent, content }),
        3 => (any::<u8>(), content_strategy())
            .prop_map(|(offset_percent, content)| EditOp::Insert { offset_percent, content }),
        3 => (any::<u8>(), any::<u8>())
            .prop_map(|(offset_percent, len_percent)| EditOp::Delete { offset_percent, len_percent }),
        1 => content_strategy().prop_map(|content| EditOp::Append { content }),
    ]
}

/// Exact chunk layout: kind, source window offset, length and bytes.
fn layout(buffer: &Buffer) -> Vec<(ChunkKind, usize, Vec<u8>)> {
    buffer
        .chunks()
        .map(|chunk| {
            let offset = match chunk {
                Chunk::Source(source) => source.offset(),
                Chunk::Memory(_) => 0,
            };
            (chunk.kind(), offset, chunk.as_slice().to_vec())
        })
        .collect()
}

fn naive_find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}

fn naive_rfind(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    let last = from.min(haystack.len() - needle.len());
    (0..=last).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn edits_match_shadow(
        initial in prop::collection::vec(any::<u8>(), 0..200),
        ops in prop::collection::vec(edit_op(), 1..24),
    ) {
        let mut buffer = Buffer::from_bytes(initial.clone());
        let mut shadow = initial;

        for op in &ops {
            if let Some(resolved) = op.resolve(shadow.len()) {
                resolved.apply(&mut buffer);
                resolved.apply_to_shadow(&mut shadow);
            }
            prop_assert_eq!(buffer.len(), shadow.len());
            prop_assert_eq!(buffer.chunk_list().measured_len(), buffer.len());
            prop_assert_eq!(buffer.to_vec(), shadow.clone());
            let empty_chunks = buffer.chunks().filter(|chunk| chunk.is_empty()).count();
            prop_assert!(empty_chunks == 0 || buffer.chunks().count() == 1);
        }
    }

    #[test]
    fn undo_all_then_redo_all_restores_every_layout(
        initial in prop::collection::vec(any::<u8>(), 1..160),
        ops in prop::collection::vec(edit_op(), 1..16),
    ) {
        let mut buffer = Buffer::from_bytes(initial);
        let mut layouts = vec![layout(&buffer)];

        for op in &ops {
            if let Some(resolved) = op.resolve(buffer.len()) {
                resolved.apply(&mut buffer);
                layouts.push(layout(&buffer));
            }
        }

        for expected in layouts.iter().rev().skip(1) {
            prop_assert!(buffer.can_undo());
            buffer.undo();
            prop_assert_eq!(&layout(&buffer), expected);
            prop_assert_eq!(buffer.chunk_list().measured_len(), buffer.len());
        }
        prop_assert!(!buffer.can_undo());

        for expected in layouts.iter().skip(1) {
            prop_assert!(buffer.can_redo());
            buffer.redo();
            prop_assert_eq!(&layout(&buffer), expected);
        }
        prop_assert!(!buffer.can_redo());
    }

    #[test]
    fn undo_modifications_rebuild_the_previous_content(
        initial in prop::collection::vec(any::<u8>(), 0..120),
        ops in prop::collection::vec(edit_op(), 1..12),
    ) {
        let mut buffer = Buffer::from_bytes(initial);
        for op in &ops {
            let Some(resolved) = op.resolve(buffer.len()) else { continue };
            let before = buffer.to_vec();
            resolved.apply(&mut buffer);

            let mut replica = Buffer::from_bytes(buffer.to_vec());
            for modification in buffer.undo() {
                replica.apply(&modification);
            }
            prop_assert_eq!(replica.to_vec(), before.clone());
            prop_assert_eq!(buffer.to_vec(), before);
            buffer.redo();
        }
    }

    #[test]
    fn find_agrees_with_naive_search(
        initial in prop::collection::vec(0u8..4, 1..160),
        ops in prop::collection::vec(edit_op(), 0..10),
        needle in prop::collection::vec(0u8..4, 1..5),
        from_percent in any::<u8>(),
    ) {
        let mut buffer = Buffer::from_bytes(initial);
        for op in &ops {
            if let Some(resolved) = op.resolve(buffer.len()) {
                resolved.apply(&mut buffer);
            }
        }
        let content = buffer.to_vec();
        let from = scaled(content.len(), from_percent);
        let cancel = CancellationToken::new();

        prop_assert_eq!(
            buffer.find(&needle, FindOptions::forward(from), &cancel).unwrap(),
            naive_find(&content, &needle, from)
        );
        prop_assert_eq!(
            buffer.find(&needle, FindOptions::backward(from), &cancel).unwrap(),
            naive_rfind(&content, &needle, from)
        );
        let wrapped = buffer
            .find(&needle, FindOptions::forward(from).wrapping(), &cancel)
            .unwrap();
        prop_assert_eq!(
            wrapped,
            naive_find(&content, &needle, from).or_else(|| naive_find(&content, &needle, 0))
        );
    }
}
