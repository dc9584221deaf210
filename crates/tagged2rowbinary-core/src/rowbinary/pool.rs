// Scratch buffer pool
//
// Buffers are handed out behind a guard; dropping the guard clears the buffer
// and puts it back, so early returns and `?` paths release it too.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::WriteBuffer;

/// Buffers that grew beyond this are dropped instead of pooled.
pub const MAX_POOLED_CAPACITY: usize = 4 * 1024 * 1024;

const DEFAULT_BUFFER_CAPACITY: usize = 4 * 1024;
const MAX_IDLE_BUFFERS: usize = 64;

static GLOBAL_POOL: Lazy<Arc<BufferPool>> = Lazy::new(|| Arc::new(BufferPool::new()));

/// Pool of reusable [`WriteBuffer`]s.
///
/// The pool itself is thread-safe; a checked-out buffer belongs to exactly
/// one guard and is never shared.
#[derive(Debug, Default)]
pub struct BufferPool {
    idle: Mutex<Vec<WriteBuffer>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide pool.
    pub fn global() -> Arc<BufferPool> {
        Arc::clone(&GLOBAL_POOL)
    }

    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buffer = self
            .idle
            .lock()
            .pop()
            .unwrap_or_else(|| WriteBuffer::with_capacity(DEFAULT_BUFFER_CAPACITY));
        PooledBuffer { pool: self, buffer }
    }

    /// Number of buffers currently waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, mut buffer: WriteBuffer) {
        if buffer.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        buffer.reset();
        let mut idle = self.idle.lock();
        if idle.len() < MAX_IDLE_BUFFERS {
            idle.push(buffer);
        }
    }
}

/// A buffer checked out of a [`BufferPool`].
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buffer: WriteBuffer,
}

impl Deref for PooledBuffer<'_> {
    type Target = WriteBuffer;

    fn deref(&self) -> &WriteBuffer {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut WriteBuffer {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_return_to_pool_clean() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.acquire();
            buf.write_string("leftover");
            assert!(!buf.is_empty());
        }
        assert_eq!(pool.idle_count(), 1);

        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_released_on_early_return() {
        fn encode(pool: &BufferPool, fail: bool) -> Result<usize, &'static str> {
            let mut buf = pool.acquire();
            buf.write_u32(1);
            if fail {
                return Err("boom");
            }
            Ok(buf.len())
        }

        let pool = BufferPool::new();
        assert!(encode(&pool, true).is_err());
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(encode(&pool, false), Ok(4));
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_oversized_buffers_are_not_pooled() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.acquire();
            buf.write_raw(&vec![0u8; MAX_POOLED_CAPACITY + 1]);
        }
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_concurrent_guards_get_distinct_buffers() {
        let pool = BufferPool::new();
        let mut a = pool.acquire();
        let mut b = pool.acquire();
        a.write_u8(1);
        b.write_u8(2);
        assert_eq!(a.as_bytes(), &[1]);
        assert_eq!(b.as_bytes(), &[2]);
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 2);
    }
}
