//! Growable output buffer for a single encode call.

use bytes::Bytes;
use tracing::trace;

/// Default starting capacity in bytes.
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

/// Output buffer that doubles its capacity whenever a write would overflow.
///
/// Owned by one encode call; [`freeze`](Self::freeze) hands the bytes to
/// the caller without copying.
#[derive(Debug)]
pub struct EncodeBuffer {
    data: Vec<u8>,
    /// Logical capacity; always a power-of-two multiple of the starting size
    capacity: usize,
}

impl Default for EncodeBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }
}

impl EncodeBuffer {
    /// Create a buffer with the default starting capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with an explicit starting capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Make room for `additional` more bytes, doubling until they fit.
    fn ensure(&mut self, additional: usize) {
        let needed = self.data.len().saturating_add(additional);
        if needed <= self.capacity {
            return;
        }
        let mut capacity = self.capacity;
        while capacity < needed {
            capacity = capacity.saturating_mul(2);
        }
        trace!(from = self.capacity, to = capacity, "growing encode buffer");
        self.data.reserve_exact(capacity - self.data.len());
        self.capacity = capacity;
    }

    /// Append a byte slice.
    #[inline]
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.ensure(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Append a single byte.
    #[inline]
    pub fn put_u8(&mut self, byte: u8) {
        self.ensure(1);
        self.data.push(byte);
    }

    /// Drop the written bytes, keeping the capacity for reuse.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Hand the written bytes over to the caller.
    pub fn freeze(self) -> Bytes {
        Bytes::from(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        let buf = EncodeBuffer::new();
        assert_eq!(buf.capacity(), DEFAULT_INITIAL_CAPACITY);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_capacity_doubles_on_overflow() {
        let mut buf = EncodeBuffer::with_capacity(4);
        buf.put_slice(&[1, 2, 3, 4]);
        assert_eq!(buf.capacity(), 4);

        buf.put_u8(5);
        assert_eq!(buf.capacity(), 8);

        // A large write doubles repeatedly until it fits
        buf.put_slice(&[0; 30]);
        assert_eq!(buf.capacity(), 64);
        assert_eq!(buf.len(), 35);
    }

    #[test]
    fn test_growth_preserves_contents() {
        let mut buf = EncodeBuffer::with_capacity(1);
        for i in 0..=255u8 {
            buf.put_u8(i);
        }
        let frozen = buf.freeze();
        assert_eq!(frozen.len(), 256);
        assert!(frozen.iter().enumerate().all(|(i, b)| *b == i as u8));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buf = EncodeBuffer::with_capacity(4);
        buf.put_slice(&[0; 10]);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 16);

        buf.put_slice(b"xy");
        assert_eq!(buf.as_slice(), b"xy");
    }

    #[test]
    fn test_zero_capacity_still_grows() {
        let mut buf = EncodeBuffer::with_capacity(0);
        buf.put_slice(b"abc");
        assert_eq!(buf.as_slice(), b"abc");
        assert!(buf.capacity() >= 3);
    }
}
