//! Growable byte buffer with a hard ceiling

use crate::error::{Result, XmlError};

/// Default initial allocation: 16 MiB
pub const DEFAULT_INITIAL_CAPACITY: usize = 16 * 1024 * 1024;

/// Default hard ceiling: 2 GiB
pub const DEFAULT_MAX_CAPACITY: usize = 2 * 1024 * 1024 * 1024;

/// UTF-8 output buffer that doubles its allocation on overflow, up to a limit.
#[derive(Debug)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
    limit: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY)
    }

    pub fn with_limits(initial_capacity: usize, limit: usize) -> Self {
        ByteBuffer {
            bytes: Vec::with_capacity(initial_capacity.min(limit)),
            limit,
        }
    }

    /// Encode a text fragment onto the end of the buffer.
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        let needed = self.bytes.len() + text.len();
        if needed > self.limit {
            return Err(XmlError::CapacityExceeded {
                requested: needed,
                limit: self.limit,
            });
        }
        if needed > self.bytes.capacity() {
            self.grow(needed);
        }
        self.bytes.extend_from_slice(text.as_bytes());
        Ok(())
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Currently allocated capacity
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Hand over the written bytes. The allocation moves with them.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn grow(&mut self, needed: usize) {
        let mut capacity = self.bytes.capacity().max(1);
        while capacity < needed {
            capacity = capacity.saturating_mul(2).min(self.limit);
        }

        tracing::debug!(
            from = self.bytes.capacity(),
            to = capacity,
            "growing encoder byte buffer"
        );
        self.bytes.reserve_exact(capacity - self.bytes.len());
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
