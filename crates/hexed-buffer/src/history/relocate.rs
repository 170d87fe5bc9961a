//! Moving the replay context between the nodes touched by consecutive changes.
//!
//! Node handles do not survive an undo/redo cycle because removed chunks come
//! back under fresh handles. Changes therefore address their target relative
//! to the node the previous change left as context.

use crate::list::{ChunkList, NodeId};

pub(crate) trait Links {
    fn next(&self, id: NodeId) -> Option<NodeId>;
    fn prev(&self, id: NodeId) -> Option<NodeId>;
}

impl Links for ChunkList {
    fn next(&self, id: NodeId) -> Option<NodeId> {
        ChunkList::next(self, id)
    }

    fn prev(&self, id: NodeId) -> Option<NodeId> {
        ChunkList::prev(self, id)
    }
}

/// What a change did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    Touched,
    Inserted(NodeId),
    Removed {
        successor: Option<NodeId>,
        predecessor: Option<NodeId>,
    },
}

fn walk<L: Links + ?Sized>(links: &L, from: NodeId, hops: isize) -> NodeId {
    let mut id = from;
    for _ in 0..hops.unsigned_abs() {
        let step = if hops > 0 { links.next(id) } else { links.prev(id) };
        id = match step {
            Some(step) => step,
            None => panic!("change context walked off the chunk list"),
        };
    }
    id
}

/// The node a change with `hops` addresses when replayed from `context`.
pub(crate) fn target<L: Links + ?Sized>(links: &L, context: NodeId, hops: isize) -> NodeId {
    walk(links, context, hops)
}

/// The context a change leaves behind.
pub(crate) fn settle(target: NodeId, effect: Effect) -> NodeId {
    match effect {
        Effect::Touched => target,
        Effect::Inserted(inserted) => inserted,
        Effect::Removed {
            successor,
            predecessor,
        } => match successor.or(predecessor) {
            Some(id) => id,
            None => panic!("removed the only chunk of the list"),
        },
    }
}

/// The context a change started from, given the target restored by its revert.
pub(crate) fn origin<L: Links + ?Sized>(links: &L, target: NodeId, hops: isize) -> NodeId {
    walk(links, target, -hops)
}

/// Signed hop count from `from` to `to`, searching both directions.
pub(crate) fn distance<L: Links + ?Sized>(links: &L, from: NodeId, to: NodeId) -> isize {
    if from == to {
        return 0;
    }
    let (mut ahead, mut behind) = (Some(from), Some(from));
    let mut hops = 0isize;
    while ahead.is_some() || behind.is_some() {
        hops += 1;
        ahead = ahead.and_then(|id| links.next(id));
        behind = behind.and_then(|id| links.prev(id));
        if ahead == Some(to) {
            return hops;
        }
        if behind == Some(to) {
            return -hops;
        }
    }
    panic!("change target is not linked to the context");
}
