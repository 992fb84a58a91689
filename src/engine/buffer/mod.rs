use ringbuf::{
    traits::{Consumer, Observer, Producer},
    HeapRb,
};

const MIN_CAPACITY: usize = 4096;

/// FIFO of converted PCM bytes waiting to be handed to the caller.
/// Decoded blocks rarely line up with the caller's read size, so whatever
/// a read does not consume stays here for the next one.
/// Backed by a heap ring buffer that is regrown when a block does not fit.
pub struct PcmBuffer {
    inner: HeapRb<u8>,
}

impl PcmBuffer {
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: HeapRb::new(capacity.max(1)),
        }
    }

    /// Appends `bytes`, growing the buffer if needed. Never drops data.
    pub fn push_slice(&mut self, bytes: &[u8]) {
        if self.inner.vacant_len() < bytes.len() {
            self.grow(self.inner.occupied_len() + bytes.len());
        }
        let pushed = self.inner.push_slice(bytes);
        debug_assert_eq!(pushed, bytes.len());
    }

    /// Pops bytes into the provided slice.
    /// Returns the number of bytes successfully popped.
    pub fn pop_slice(&mut self, out: &mut [u8]) -> usize {
        self.inner.pop_slice(out)
    }

    /// Returns the number of bytes available.
    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }

    /// Discards everything pending.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    fn grow(&mut self, required: usize) {
        let capacity = required.max(MIN_CAPACITY).next_power_of_two();
        let mut pending = vec![0u8; self.inner.occupied_len()];
        let moved = self.inner.pop_slice(&mut pending);
        pending.truncate(moved);

        let mut next = HeapRb::new(capacity);
        next.push_slice(&pending);
        self.inner = next;
    }
}

impl Default for PcmBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_across_growth() {
        let mut buf = PcmBuffer::with_capacity(4);
        buf.push_slice(&[1, 2, 3]);
        let mut head = [0u8; 2];
        assert_eq!(buf.pop_slice(&mut head), 2);
        assert_eq!(head, [1, 2]);

        let big: Vec<u8> = (0..100).collect();
        buf.push_slice(&big);
        assert_eq!(buf.len(), 101);
        assert!(buf.capacity() >= 101);

        let mut all = vec![0u8; 200];
        let n = buf.pop_slice(&mut all);
        assert_eq!(n, 101);
        assert_eq!(all[0], 3);
        assert_eq!(&all[1..101], big.as_slice());
        assert!(buf.is_empty());
    }

    #[test]
    fn clear_drops_pending() {
        let mut buf = PcmBuffer::new();
        buf.push_slice(&[9; 64]);
        buf.clear();
        assert_eq!(buf.len(), 0);
        let mut out = [0u8; 8];
        assert_eq!(buf.pop_slice(&mut out), 0);
    }
}
