//! Free-list of encode buffers.
//!
//! Every call encodes an envelope that lives only until it has been handed
//! to the transport, so the buffers can be reused instead of reallocated.

use crate::message::Message;
use crate::writer::Writer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Default number of idle buffers kept.
pub const DEFAULT_MAX_POOLED: usize = 32;

/// Buffers that grew past this are dropped instead of pooled.
pub const DEFAULT_MAX_BUFFER_CAPACITY: usize = 64 * 1024;

/// Statistics for the buffer pool
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Buffers served from the free-list
    pub hits: AtomicU64,
    /// Buffers freshly allocated
    pub misses: AtomicU64,
    /// Buffers discarded because they were too large or the pool was full
    pub discarded: AtomicU64,
}

#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_pooled: usize,
    max_capacity: usize,
    stats: PoolStats,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POOLED)
    }
}

impl BufferPool {
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_pooled)),
            max_pooled,
            max_capacity: DEFAULT_MAX_BUFFER_CAPACITY,
            stats: PoolStats::default(),
        }
    }

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Take an empty buffer.
    pub fn take(&self) -> Vec<u8> {
        match self.free.lock().pop() {
            Some(buf) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Vec::new()
            }
        }
    }

    /// Return a buffer for reuse.
    pub fn give(&self, mut buf: Vec<u8>) {
        if buf.capacity() > self.max_capacity {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
            trace!(capacity = buf.capacity(), "Discarding oversized buffer");
            return;
        }
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_pooled {
            free.push(buf);
        } else {
            self.stats.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Encode `message` into a pooled buffer and hand the bytes to `f`.
    ///
    /// The buffer goes back to the pool once `f` returns.
    pub fn with_encoded<M, F, R>(&self, message: &M, f: F) -> R
    where
        M: Message,
        F: FnOnce(&[u8]) -> R,
    {
        let mut writer = Writer::with_buffer(self.take());
        message.encode_raw(&mut writer);
        let buf = writer.into_inner();
        let result = f(&buf);
        self.give(buf);
        result
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Note(String);

    impl Message for Note {
        fn encode_raw(&self, w: &mut Writer) {
            w.write_string(1, &self.0);
        }

        fn merge_field(
            &mut self,
            field: crate::Field,
            r: &mut crate::Reader<'_>,
        ) -> Result<(), crate::DecodeError> {
            match field.number {
                1 => self.0 = r.read_string(field)?.to_owned(),
                _ => r.skip(field)?,
            }
            Ok(())
        }
    }

    #[test]
    fn test_buffers_are_reused() {
        let pool = BufferPool::new(4);
        let a = pool.take();
        assert_eq!(pool.stats().misses.load(Ordering::Relaxed), 1);
        pool.give(a);
        assert_eq!(pool.idle(), 1);

        let b = pool.take();
        assert!(b.is_empty());
        assert_eq!(pool.stats().hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = BufferPool::new(1);
        pool.give(Vec::new());
        pool.give(Vec::new());
        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.stats().discarded.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_oversized_buffers_dropped() {
        let pool = BufferPool::new(4).with_max_capacity(16);
        pool.give(Vec::with_capacity(1024));
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_with_encoded_returns_buffer() {
        let pool = BufferPool::new(4);
        let decoded = pool.with_encoded(&Note("hello".into()), Note::decode).unwrap();
        assert_eq!(decoded, Note("hello".into()));
        assert_eq!(pool.idle(), 1);

        // Second encode starts from a cleared buffer.
        let decoded = pool.with_encoded(&Note("x".into()), Note::decode).unwrap();
        assert_eq!(decoded, Note("x".into()));
    }
}
