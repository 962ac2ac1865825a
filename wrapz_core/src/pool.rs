use std::ops::{Deref, DerefMut};

use crossbeam::queue::ArrayQueue;

/// Bounded set of idle byte buffers shared by concurrent encode/decode calls.
///
/// Acquiring never blocks: an empty pool allocates a fresh buffer. Releasing
/// into a full pool drops the buffer, which caps memory held by the pool at
/// `capacity` buffers after a burst of concurrent use.
#[derive(Debug)]
pub struct BufferPool {
    idle: ArrayQueue<Vec<u8>>,
}

impl BufferPool {
    /// Create an empty pool holding at most `capacity` idle buffers (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Take an idle buffer, or allocate one. The result is always empty.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let mut buf = self.idle.pop().unwrap_or_default();
        buf.clear();
        PooledBuffer { buf, pool: self }
    }

    /// Like [`acquire`](Self::acquire), reserving room for `capacity` bytes.
    pub fn acquire_with_capacity(&self, capacity: usize) -> PooledBuffer<'_> {
        let mut buf = self.acquire();
        buf.reserve(capacity);
        buf
    }

    /// Hand a buffer back for reuse. Its capacity is kept.
    pub fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        if self.idle.push(buf).is_err() {
            tracing::trace!(capacity = self.idle.capacity(), "buffer pool full, dropping buffer");
        }
    }

    /// Number of buffers currently idle.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn capacity(&self) -> usize {
        self.idle.capacity()
    }
}

/// A buffer on loan from a [`BufferPool`], returned to it on drop.
///
/// Dropping is the only way back into the pool, so early returns and `?`
/// on error paths release buffers the same way the happy path does.
#[derive(Debug)]
pub struct PooledBuffer<'p> {
    buf: Vec<u8>,
    pool: &'p BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
