//! Shared pool of reusable byte buffers.
//!
//! Chunk buffers are large (on the order of the chunk size), so the pipeline
//! rents them from here and recycles them once the chunk they back has been
//! spilled. A buffer is held by exactly one stage at a time.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Thread-safe pool of byte buffers with rent/recycle discipline.
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    initial_capacity: usize,
    max_pooled: usize,
    allocated: AtomicUsize,
}

impl BufferPool {
    /// Create a pool whose new buffers start with `initial_capacity` bytes and
    /// which keeps at most `max_pooled` idle buffers.
    #[must_use]
    pub fn new(initial_capacity: usize, max_pooled: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_pooled)),
            initial_capacity,
            max_pooled,
            allocated: AtomicUsize::new(0),
        }
    }

    /// Take an empty buffer, reusing an idle one when available.
    pub fn rent(&self) -> Vec<u8> {
        if let Some(buffer) = self.free.lock().pop() {
            return buffer;
        }
        self.allocated.fetch_add(1, Ordering::Relaxed);
        Vec::with_capacity(self.initial_capacity)
    }

    /// Return a buffer to the pool. It is cleared; its capacity is kept.
    pub fn recycle(&self, mut buffer: Vec<u8>) {
        buffer.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_pooled {
            free.push(buffer);
        }
    }

    /// Number of buffers this pool has allocated.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Number of idle buffers currently pooled.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}
