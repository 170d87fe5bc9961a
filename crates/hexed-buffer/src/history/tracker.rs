use super::change::Change;
use crate::event::Modification;
use crate::list::{ChunkList, NodeId};

/// The context node a collection starts from: the node at `offset`, or its
/// predecessor when `at_previous` is set.
pub(crate) fn locate_context(list: &ChunkList, offset: usize, at_previous: bool) -> NodeId {
    let (node, _) = list.locate(offset);
    if !at_previous {
        return node;
    }
    match list.prev(node) {
        Some(prev) => prev,
        None => panic!("change collection starts before the first chunk"),
    }
}

/// Every change made by one write, insert or delete call.
#[derive(Debug, Clone)]
pub struct ChangeCollection {
    modification: Modification,
    inverse: Vec<Modification>,
    change_offset: usize,
    start_at_previous: bool,
    end_offset: usize,
    changes: Vec<Change>,
}

impl ChangeCollection {
    pub(crate) fn new(
        modification: Modification,
        inverse: Vec<Modification>,
        change_offset: usize,
        start_at_previous: bool,
        end_offset: usize,
        changes: Vec<Change>,
    ) -> Self {
        Self {
            modification,
            inverse,
            change_offset,
            start_at_previous,
            end_offset,
            changes,
        }
    }

    pub fn modification(&self) -> &Modification {
        &self.modification
    }

    /// Modifications that bring the buffer back to its state before this collection.
    pub fn inverse(&self) -> &[Modification] {
        &self.inverse
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub(crate) fn redo(&mut self, list: &mut ChunkList) {
        let mut context = locate_context(list, self.change_offset, self.start_at_previous);
        for change in &mut self.changes {
            context = change.apply(list, context);
        }
        tracing::trace!(changes = self.changes.len(), "redid change collection");
    }

    pub(crate) fn undo(&mut self, list: &mut ChunkList) {
        let (mut context, _) = list.locate(self.end_offset);
        for change in self.changes.iter_mut().rev() {
            context = change.revert(list, context);
        }
        tracing::trace!(changes = self.changes.len(), "undid change collection");
    }
}

/// Collections undone and redone as one step.
#[derive(Debug, Clone, Default)]
pub struct ChangeCollectionGroup {
    collections: Vec<ChangeCollection>,
}

impl ChangeCollectionGroup {
    pub fn collections(&self) -> &[ChangeCollection] {
        &self.collections
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    fn push(&mut self, collection: ChangeCollection) {
        self.collections.push(collection);
    }

    /// Reverts every collection, last first, returning the modifications that describe it.
    fn undo(&mut self, list: &mut ChunkList) -> Vec<Modification> {
        let mut applied = Vec::new();
        for collection in self.collections.iter_mut().rev() {
            collection.undo(list);
            applied.extend(collection.inverse.iter().cloned());
        }
        applied
    }

    fn redo(&mut self, list: &mut ChunkList) -> Vec<Modification> {
        self.collections
            .iter_mut()
            .map(|collection| {
                collection.redo(list);
                collection.modification.clone()
            })
            .collect()
    }
}

/// Undo and redo stacks for one buffer.
#[derive(Debug)]
pub struct ChangeTracker {
    undo: Vec<ChangeCollectionGroup>,
    redo: Vec<ChangeCollectionGroup>,
    open: Option<ChangeCollectionGroup>,
    depth: usize,
    enabled: bool,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ChangeTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            open: None,
            depth: 0,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turning history off drops everything recorded so far.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.undo.clear();
            self.redo.clear();
            if let Some(open) = self.open.as_mut() {
                open.collections.clear();
            }
        }
        self.enabled = enabled;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn is_grouping(&self) -> bool {
        self.depth > 0
    }

    pub fn record(&mut self, collection: ChangeCollection) {
        if !self.enabled {
            return;
        }
        self.redo.clear();
        match self.open.as_mut() {
            Some(open) => open.push(collection),
            None => {
                let mut group = ChangeCollectionGroup::default();
                group.push(collection);
                self.undo.push(group);
            }
        }
    }

    /// Starts collecting recorded changes into one group. Groups nest; only
    /// the outermost [`ChangeTracker::end_group`] closes it.
    pub fn begin_group(&mut self) {
        self.depth += 1;
        if self.open.is_none() {
            self.open = Some(ChangeCollectionGroup::default());
        }
    }

    pub fn end_group(&mut self) {
        assert!(self.depth > 0, "end_group without a matching begin_group");
        self.depth -= 1;
        if self.depth > 0 {
            return;
        }
        if let Some(group) = self.open.take()
            && !group.is_empty()
        {
            self.undo.push(group);
        }
    }

    pub(crate) fn undo(&mut self, list: &mut ChunkList) -> Vec<Modification> {
        assert!(self.depth == 0, "cannot undo while a change group is open");
        let Some(mut group) = self.undo.pop() else {
            panic!("nothing to undo");
        };
        let modifications = group.undo(list);
        self.redo.push(group);
        modifications
    }

    pub(crate) fn redo(&mut self, list: &mut ChunkList) -> Vec<Modification> {
        assert!(self.depth == 0, "cannot redo while a change group is open");
        let Some(mut group) = self.redo.pop() else {
            panic!("nothing to redo");
        };
        let modifications = group.redo(list);
        self.undo.push(group);
        modifications
    }
}
