//! Ordered chunk storage addressed by generation-checked handles.

use crate::chunk::Chunk;
use slab::Slab;

/// Handle to a node of a [`ChunkList`].
///
/// Slab keys are reused after removal, so every handle also carries the
/// generation the node was created with. A handle to a removed node never
/// resolves, even when its key has been recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    key: usize,
    generation: u64,
}

impl NodeId {
    #[cfg(test)]
    pub(crate) fn from_parts(key: usize, generation: u64) -> Self {
        Self { key, generation }
    }
}

#[derive(Debug)]
struct Node {
    chunk: Chunk,
    generation: u64,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Doubly linked list of chunks whose concatenation is the logical document.
///
/// The list is never empty and always knows the sum of its chunk lengths.
#[derive(Debug)]
pub struct ChunkList {
    nodes: Slab<Node>,
    head: NodeId,
    tail: NodeId,
    byte_len: usize,
    next_generation: u64,
}

impl ChunkList {
    pub fn new(first: Chunk) -> Self {
        let byte_len = first.len();
        let mut nodes = Slab::new();
        let key = nodes.insert(Node {
            chunk: first,
            generation: 0,
            prev: None,
            next: None,
        });
        let id = NodeId { key, generation: 0 };
        Self {
            nodes,
            head: id,
            tail: id,
            byte_len,
            next_generation: 1,
        }
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn tail(&self) -> NodeId {
        self.tail
    }

    /// Total number of logical bytes.
    pub fn len_bytes(&self) -> usize {
        self.byte_len
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Chunk> {
        self.node(id).map(|node| &node.chunk)
    }

    /// Chunk behind `id`.
    ///
    /// Panics on a stale handle: every caller holds handles it just obtained
    /// from this list, so a miss means the edit log is out of sync.
    pub fn chunk(&self, id: NodeId) -> &Chunk {
        &self.expect_node(id).chunk
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.expect_node(id).next
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.expect_node(id).prev
    }

    /// Mutates a chunk in place, keeping the byte length in sync.
    pub(crate) fn update<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Chunk) -> R) -> R {
        let node = self.expect_node_mut(id);
        let before = node.chunk.len();
        let result = f(&mut node.chunk);
        let after = node.chunk.len();
        self.byte_len = self.byte_len - before + after;
        result
    }

    pub(crate) fn insert_before(&mut self, anchor: NodeId, chunk: Chunk) -> NodeId {
        let prev = self.prev(anchor);
        let id = self.link(chunk, prev, Some(anchor));
        match prev {
            Some(prev) => self.expect_node_mut(prev).next = Some(id),
            None => self.head = id,
        }
        self.expect_node_mut(anchor).prev = Some(id);
        id
    }

    pub(crate) fn insert_after(&mut self, anchor: NodeId, chunk: Chunk) -> NodeId {
        let next = self.next(anchor);
        let id = self.link(chunk, Some(anchor), next);
        match next {
            Some(next) => self.expect_node_mut(next).prev = Some(id),
            None => self.tail = id,
        }
        self.expect_node_mut(anchor).next = Some(id);
        id
    }

    /// Unlinks a node and hands its chunk back. The sole node cannot be removed.
    pub(crate) fn remove(&mut self, id: NodeId) -> Chunk {
        assert!(self.contains(id), "stale chunk handle {id:?}");
        assert!(self.nodes.len() > 1, "cannot remove the last chunk");

        let node = self.nodes.remove(id.key);
        match node.prev {
            Some(prev) => self.expect_node_mut(prev).next = node.next,
            None => match node.next {
                Some(next) => self.head = next,
                None => panic!("head without successor in multi-node list"),
            },
        }
        match node.next {
            Some(next) => self.expect_node_mut(next).prev = node.prev,
            None => match node.prev {
                Some(prev) => self.tail = prev,
                None => panic!("tail without predecessor in multi-node list"),
            },
        }
        self.byte_len -= node.chunk.len();
        node.chunk
    }

    /// Node whose span contains `offset`, with the node's start offset.
    ///
    /// `offset == len_bytes()` resolves to the tail, the append position.
    pub fn locate(&self, offset: usize) -> (NodeId, usize) {
        assert!(
            offset <= self.byte_len,
            "offset {offset} past end of buffer ({})",
            self.byte_len
        );

        let mut start = 0usize;
        let mut cursor = Some(self.head);
        while let Some(id) = cursor {
            let node = self.expect_node(id);
            let end = start + node.chunk.len();
            if offset < end {
                return (id, start);
            }
            start = end;
            cursor = node.next;
        }

        let tail_len = self.chunk(self.tail).len();
        (self.tail, self.byte_len - tail_len)
    }

    /// Logical offset at which `id` starts.
    pub fn start_of(&self, id: NodeId) -> usize {
        let mut start = 0usize;
        for (node, _, chunk) in self.spans() {
            if node == id {
                return start;
            }
            start += chunk.len();
        }
        panic!("stale chunk handle {id:?}");
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Chunk)> + '_ {
        self.spans().map(|(id, _, chunk)| (id, chunk))
    }

    /// Nodes in order with their logical start offsets.
    pub fn spans(&self) -> Spans<'_> {
        Spans {
            list: self,
            cursor: Some(self.head),
            start: 0,
        }
    }

    /// Copies logical bytes starting at `offset`, crossing chunk boundaries.
    pub fn read(&self, offset: usize, dest: &mut [u8]) -> usize {
        if dest.is_empty() || offset >= self.byte_len {
            return 0;
        }

        let (mut id, node_start) = self.locate(offset);
        let mut relative = offset - node_start;
        let mut copied = 0usize;
        loop {
            copied += self.chunk(id).read(&mut dest[copied..], relative);
            relative = 0;
            if copied == dest.len() {
                break;
            }
            match self.next(id) {
                Some(next) => id = next,
                None => break,
            }
        }
        copied
    }

    /// Sum of the chunk lengths, walked from the head.
    pub fn measured_len(&self) -> usize {
        self.iter().map(|(_, chunk)| chunk.len()).sum()
    }

    fn link(&mut self, chunk: Chunk, prev: Option<NodeId>, next: Option<NodeId>) -> NodeId {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.byte_len += chunk.len();
        let key = self.nodes.insert(Node {
            chunk,
            generation,
            prev,
            next,
        });
        NodeId { key, generation }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.key)
            .filter(|node| node.generation == id.generation)
    }

    fn expect_node(&self, id: NodeId) -> &Node {
        match self.node(id) {
            Some(node) => node,
            None => panic!("stale chunk handle {id:?}"),
        }
    }

    fn expect_node_mut(&mut self, id: NodeId) -> &mut Node {
        match self
            .nodes
            .get_mut(id.key)
            .filter(|node| node.generation == id.generation)
        {
            Some(node) => node,
            None => panic!("stale chunk handle {id:?}"),
        }
    }
}

/// Iterator over `(node, start offset, chunk)`.
pub struct Spans<'a> {
    list: &'a ChunkList,
    cursor: Option<NodeId>,
    start: usize,
}

impl<'a> Iterator for Spans<'a> {
    type Item = (NodeId, usize, &'a Chunk);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.list.expect_node(id);
        let start = self.start;
        self.start += node.chunk.len();
        self.cursor = node.next;
        Some((id, start, &node.chunk))
    }
}
