use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// Pool of fixed-size scratch buffers used by reads and searches.
#[derive(Debug)]
pub struct ScratchPool {
    free: Mutex<Vec<Vec<u8>>>,
    buffer_size: usize,
    limit: usize,
}

impl ScratchPool {
    /// Creates a pool handing out `buffer_size`-byte buffers and keeping at most `limit` idle.
    pub fn new(buffer_size: usize, limit: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            buffer_size: buffer_size.max(1),
            limit,
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Takes an idle buffer or allocates one. The buffer is zero-filled only when fresh.
    pub fn get(&self) -> ScratchBuffer<'_> {
        let bytes = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| vec![0u8; self.buffer_size]);
        ScratchBuffer { bytes, pool: self }
    }

    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, bytes: Vec<u8>) {
        let mut free = self.free.lock();
        if free.len() < self.limit {
            free.push(bytes);
        }
    }
}

/// A pooled buffer that goes back to its pool when dropped.
#[derive(Debug)]
pub struct ScratchBuffer<'a> {
    bytes: Vec<u8>,
    pool: &'a ScratchPool,
}

impl Deref for ScratchBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for ScratchBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for ScratchBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.bytes));
    }
}
