//! Fixed-capacity circular byte buffer
//!
//! Backs both directions of the host link. Capacity is a const generic so
//! buffers can live in `static` storage; nothing here allocates or grows.
//!
//! The buffer itself is not synchronized. Buffers shared between the comm
//! tick and mainline code are only touched through [`crate::comm::Comm`],
//! which wraps every operation in a critical section.

/// Ring buffer operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingError {
    /// Not enough free space for the whole write
    Overflow,
    /// Fewer bytes buffered than requested
    Underflow,
}

/// Circular byte FIFO with `N` bytes of storage
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    buf: [u8; N],
    /// Next write position
    head: usize,
    /// Oldest buffered byte
    tail: usize,
    used: usize,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            head: 0,
            tail: 0,
            used: 0,
        }
    }

    /// Empty the buffer without touching its storage
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.used = 0;
    }

    /// Total capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes currently buffered
    pub fn bytes_used(&self) -> usize {
        self.used
    }

    /// Bytes that can still be enqueued
    pub fn bytes_free(&self) -> usize {
        N - self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn is_full(&self) -> bool {
        self.used == N
    }

    /// Append `data` at the head
    ///
    /// All or nothing: fails with [`RingError::Overflow`] and writes
    /// nothing if `data` does not fit.
    pub fn enqueue(&mut self, data: &[u8]) -> Result<(), RingError> {
        if data.len() > self.bytes_free() {
            return Err(RingError::Overflow);
        }
        if data.is_empty() {
            return Ok(());
        }

        // At most two contiguous segments: up to the end of storage, then
        // from the start.
        let first = data.len().min(N - self.head);
        self.buf[self.head..self.head + first].copy_from_slice(&data[..first]);
        self.buf[..data.len() - first].copy_from_slice(&data[first..]);

        self.head = (self.head + data.len()) % N;
        self.used += data.len();
        Ok(())
    }

    /// Remove the oldest `out.len()` bytes into `out`
    pub fn dequeue(&mut self, out: &mut [u8]) -> Result<(), RingError> {
        self.peek_into(out)?;
        self.remove_from_tail(out.len());
        Ok(())
    }

    /// Copy the oldest `out.len()` bytes into `out` without removing them
    pub fn peek_into(&self, out: &mut [u8]) -> Result<(), RingError> {
        if out.len() > self.used {
            return Err(RingError::Underflow);
        }

        let first = out.len().min(N - self.tail);
        out[..first].copy_from_slice(&self.buf[self.tail..self.tail + first]);
        let rest = out.len() - first;
        out[first..].copy_from_slice(&self.buf[..rest]);
        Ok(())
    }

    /// Byte at `offset` from the oldest byte, without removing it
    pub fn peek(&self, offset: usize) -> Option<u8> {
        if offset >= self.used {
            return None;
        }
        Some(self.buf[(self.tail + offset) % N])
    }

    /// Offset of the first `value` at or after `start_offset`
    ///
    /// Returns [`RingBuffer::bytes_used`] when there is no such byte.
    /// Callers must compare against `bytes_used()` taken under the same
    /// critical section; there is no other "not found" value.
    pub fn find_byte(&self, value: u8, start_offset: usize) -> usize {
        (start_offset..self.used)
            .find(|&offset| self.buf[(self.tail + offset) % N] == value)
            .unwrap_or(self.used)
    }

    /// Discard the oldest `n` bytes (clamped to what is buffered)
    pub fn remove_from_tail(&mut self, n: usize) {
        let n = n.min(self.used);
        if n == 0 {
            return;
        }
        self.tail = (self.tail + n) % N;
        self.used -= n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_is_empty() {
        let rb = RingBuffer::<8>::new();
        assert!(rb.is_empty());
        assert!(!rb.is_full());
        assert_eq!(rb.capacity(), 8);
        assert_eq!(rb.bytes_used(), 0);
        assert_eq!(rb.bytes_free(), 8);
    }

    #[test]
    fn test_fifo_order_across_wrap() {
        let mut rb = RingBuffer::<8>::new();
        rb.enqueue(&[1, 2, 3, 4, 5, 6]).unwrap();
        let mut out = [0u8; 5];
        rb.dequeue(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 5]);

        // Head wraps around the end of storage
        rb.enqueue(&[7, 8, 9, 10, 11]).unwrap();
        assert_eq!(rb.bytes_used(), 6);

        let mut out = [0u8; 6];
        rb.dequeue(&mut out).unwrap();
        assert_eq!(out, [6, 7, 8, 9, 10, 11]);
        assert!(rb.is_empty());
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut rb = RingBuffer::<4>::new();
        rb.enqueue(&[1, 2, 3, 4]).unwrap();
        assert!(rb.is_full());
        assert_eq!(rb.bytes_free(), 0);
        assert_eq!(rb.enqueue(&[5]), Err(RingError::Overflow));
    }

    #[test]
    fn test_overflow_writes_nothing() {
        let mut rb = RingBuffer::<4>::new();
        rb.enqueue(&[1, 2]).unwrap();
        assert_eq!(rb.enqueue(&[3, 4, 5]), Err(RingError::Overflow));
        assert_eq!(rb.bytes_used(), 2);
        assert_eq!(rb.peek(0), Some(1));
        assert_eq!(rb.peek(1), Some(2));
    }

    #[test]
    fn test_underflow() {
        let mut rb = RingBuffer::<4>::new();
        rb.enqueue(&[1]).unwrap();
        let mut out = [0u8; 2];
        assert_eq!(rb.dequeue(&mut out), Err(RingError::Underflow));
        assert_eq!(rb.bytes_used(), 1);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut rb = RingBuffer::<4>::new();
        rb.enqueue(&[9, 8, 7]).unwrap();
        assert_eq!(rb.peek(2), Some(7));
        assert_eq!(rb.peek(3), None);

        let mut out = [0u8; 2];
        rb.peek_into(&mut out).unwrap();
        assert_eq!(out, [9, 8]);
        assert_eq!(rb.bytes_used(), 3);
    }

    #[test]
    fn test_find_byte() {
        let mut rb = RingBuffer::<8>::new();
        assert_eq!(rb.find_byte(0x01, 0), 0); // empty: sentinel == bytes_used == 0

        rb.enqueue(&[0xAA, 0x01, 0xBB, 0x01]).unwrap();
        assert_eq!(rb.find_byte(0x01, 0), 1);
        assert_eq!(rb.find_byte(0x01, 2), 3);
        assert_eq!(rb.find_byte(0xAA, 0), 0);
        assert_eq!(rb.find_byte(0x42, 0), rb.bytes_used());
        assert_eq!(rb.find_byte(0x01, 10), rb.bytes_used());
    }

    #[test]
    fn test_find_byte_across_wrap() {
        let mut rb = RingBuffer::<4>::new();
        rb.enqueue(&[1, 2, 3]).unwrap();
        rb.remove_from_tail(3);
        rb.enqueue(&[4, 5, 6]).unwrap(); // occupies indices 3, 0, 1
        assert_eq!(rb.find_byte(6, 0), 2);
        assert_eq!(rb.peek(0), Some(4));
    }

    #[test]
    fn test_remove_from_tail_clamps() {
        let mut rb = RingBuffer::<4>::new();
        rb.enqueue(&[1, 2, 3]).unwrap();
        rb.remove_from_tail(1);
        assert_eq!(rb.peek(0), Some(2));
        rb.remove_from_tail(10);
        assert!(rb.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut rb = RingBuffer::<4>::new();
        rb.enqueue(&[1, 2, 3]).unwrap();
        rb.reset();
        assert!(rb.is_empty());
        assert_eq!(rb.bytes_free(), 4);
        rb.enqueue(&[4, 5, 6, 7]).unwrap();
        assert!(rb.is_full());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Enqueue(std::vec::Vec<u8>),
        Dequeue(usize),
        Skip(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            proptest::collection::vec(any::<u8>(), 0..24).prop_map(Op::Enqueue),
            (0usize..24).prop_map(Op::Dequeue),
            (0usize..24).prop_map(Op::Skip),
        ]
    }

    proptest! {
        #[test]
        fn prop_used_plus_free_is_capacity(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let mut rb = RingBuffer::<16>::new();
            let mut model = std::collections::VecDeque::new();

            for op in ops {
                match op {
                    Op::Enqueue(data) => {
                        if data.len() <= rb.bytes_free() {
                            rb.enqueue(&data).unwrap();
                            model.extend(data.iter().copied());
                        } else {
                            prop_assert_eq!(rb.enqueue(&data), Err(RingError::Overflow));
                        }
                    }
                    Op::Dequeue(n) => {
                        let n = n.min(rb.bytes_used());
                        let mut out = std::vec![0u8; n];
                        rb.dequeue(&mut out).unwrap();
                        let expected: std::vec::Vec<u8> = model.drain(..n).collect();
                        prop_assert_eq!(out, expected);
                    }
                    Op::Skip(n) => {
                        rb.remove_from_tail(n);
                        let n = n.min(model.len());
                        model.drain(..n);
                    }
                }

                prop_assert_eq!(rb.bytes_used() + rb.bytes_free(), rb.capacity());
                prop_assert_eq!(rb.bytes_used(), model.len());
            }
        }

        #[test]
        fn prop_find_byte_absent_is_bytes_used(
            data in proptest::collection::vec(0u8..0x80, 0..16),
        ) {
            let mut rb = RingBuffer::<16>::new();
            rb.enqueue(&data).unwrap();
            prop_assert_eq!(rb.find_byte(0xFF, 0), rb.bytes_used());
        }
    }
}
