use bytes::BytesMut;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Shelf = Arc<Mutex<VecDeque<BytesMut>>>;

/// Buffers that grew past this multiple of the pool's buffer size are freed
/// instead of shelved
const MAX_RETAINED_GROWTH: usize = 4;

/// A pool of reusable connection buffers
///
/// Each accepted connection checks out one inbound and one outbound buffer.
/// Buffers go back on the shelf when the connection drops them, so a server
/// under steady load stops allocating once the pool has warmed up.
#[derive(Debug, Clone)]
pub struct BufferPool {
    shelf: Shelf,
    buffer_size: usize,
    max_pool_size: usize,
}

impl BufferPool {
    /// Create a new buffer pool
    pub fn new(buffer_size: usize, max_pool_size: usize) -> Self {
        Self {
            shelf: Arc::new(Mutex::new(VecDeque::with_capacity(max_pool_size))),
            buffer_size,
            max_pool_size,
        }
    }

    /// Get a buffer from the pool or create a new one
    pub fn get(&self) -> PooledBuffer {
        let buffer = lock(&self.shelf)
            .pop_front()
            .unwrap_or_else(|| BytesMut::with_capacity(self.buffer_size));

        PooledBuffer {
            buffer,
            shelf: Some(Arc::clone(&self.shelf)),
            max_pool_size: self.max_pool_size,
            max_capacity: self.buffer_size.saturating_mul(MAX_RETAINED_GROWTH),
        }
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            available_buffers: lock(&self.shelf).len(),
            buffer_size: self.buffer_size,
            max_pool_size: self.max_pool_size,
        }
    }
}

fn lock(shelf: &Shelf) -> MutexGuard<'_, VecDeque<BytesMut>> {
    // The shelf only holds cleared buffers, so a panic elsewhere cannot leave it inconsistent.
    shelf.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A buffer that returns to its pool when dropped
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: BytesMut,
    shelf: Option<Shelf>,
    max_pool_size: usize,
    max_capacity: usize,
}

impl PooledBuffer {
    /// A buffer that belongs to no pool and is simply freed on drop
    pub fn detached(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            shelf: None,
            max_pool_size: 0,
            max_capacity: 0,
        }
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let Some(shelf) = self.shelf.take() else {
            return;
        };

        if self.buffer.capacity() > self.max_capacity {
            return;
        }

        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();

        let mut shelf = lock(&shelf);
        if shelf.len() < self.max_pool_size {
            shelf.push_back(buffer);
        }
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

/// Statistics about buffer pool usage
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub available_buffers: usize,
    pub buffer_size: usize,
    pub max_pool_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_pool_basic() {
        let pool = BufferPool::new(1024, 5);

        let mut buffer = pool.get();
        assert!(buffer.capacity() >= 1024);
        assert!(buffer.is_empty());

        buffer.extend_from_slice(b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(pool.stats().available_buffers, 0);

        drop(buffer);
        assert_eq!(pool.stats().available_buffers, 1);
    }

    #[test]
    fn test_buffer_pool_reuse_is_cleared() {
        let pool = BufferPool::new(1024, 5);

        {
            let mut buffer = pool.get();
            buffer.extend_from_slice(b"HTTP/1.1 200 OK\r\n");
        }

        let buffer = pool.get();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 1024);
    }

    #[test]
    fn test_buffer_pool_max_size() {
        let pool = BufferPool::new(1024, 2);

        let buffers: Vec<_> = (0..3).map(|_| pool.get()).collect();
        assert_eq!(pool.stats().available_buffers, 0);

        drop(buffers);
        assert_eq!(pool.stats().available_buffers, 2);
    }

    #[test]
    fn test_oversized_buffer_is_not_shelved() {
        let pool = BufferPool::new(64, 4);

        let mut buffer = pool.get();
        buffer.resize(64 * 8, 0);
        drop(buffer);
        assert_eq!(pool.stats().available_buffers, 0);

        let mut buffer = pool.get();
        buffer.resize(128, 0);
        drop(buffer);
        assert_eq!(pool.stats().available_buffers, 1);
    }

    #[test]
    fn test_detached_buffer_skips_pool() {
        let pool = BufferPool::new(64, 4);
        drop(PooledBuffer::detached(64));
        assert_eq!(pool.stats().available_buffers, 0);
    }
}
