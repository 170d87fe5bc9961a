use crossbeam_channel::{Receiver, Sender, unbounded};

/// A chunk-agnostic description of one edit, enough to replay it on any buffer
/// holding the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    Write { offset: usize, bytes: Vec<u8> },
    Insert { offset: usize, bytes: Vec<u8> },
    Delete { offset: usize, len: usize },
}

impl Modification {
    pub fn offset(&self) -> usize {
        match self {
            Modification::Write { offset, .. }
            | Modification::Insert { offset, .. }
            | Modification::Delete { offset, .. } => *offset,
        }
    }

    /// How far the buffer length moves when this modification is applied to
    /// a buffer of `len` bytes.
    pub fn length_delta(&self, len: usize) -> isize {
        match self {
            Modification::Write { offset, bytes } => {
                (offset + bytes.len()).saturating_sub(len) as isize
            }
            Modification::Insert { bytes, .. } => bytes.len() as isize,
            Modification::Delete { len: count, .. } => -(*count as isize),
        }
    }
}

/// Who triggered a modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    User,
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferEvent {
    Modified {
        modification: Modification,
        origin: ChangeOrigin,
    },
    LengthChanged {
        previous: usize,
        current: usize,
    },
}

/// Fan-out of buffer events to any number of subscribers.
///
/// Subscribers whose receiver was dropped are pruned on the next send.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    senders: Vec<Sender<BufferEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> Receiver<BufferEvent> {
        let (sender, receiver) = unbounded();
        self.senders.push(sender);
        receiver
    }

    pub fn has_subscribers(&self) -> bool {
        !self.senders.is_empty()
    }

    pub fn send(&mut self, event: BufferEvent) {
        self.senders.retain(|sender| sender.send(event.clone()).is_ok());
    }
}
