//! Growable read buffer.
//!
//! Accumulates raw socket bytes until the parser can make progress. Capacity
//! doubles whenever a read would start on a full buffer; bytes keep their
//! offsets across growth and the buffer never shrinks.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Default starting capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct ReadBuffer {
    /// Allocated storage; `data.len()` is the capacity.
    data: Vec<u8>,
    /// Bytes filled by reads.
    filled: usize,
    /// Bytes handed to the parser and accepted.
    consumed: usize,
}

impl ReadBuffer {
    /// Create a buffer with `capacity` bytes allocated. Zero is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(1)],
            filled: 0,
            consumed: 0,
        }
    }

    /// Read once from `reader` into the free tail, doubling first when full.
    ///
    /// Returns the number of bytes read; `0` means end of stream.
    pub async fn read_from<R>(&mut self, reader: &mut R) -> std::io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        if self.filled == self.data.len() {
            self.grow();
        }
        let n = reader.read(&mut self.data[self.filled..]).await?;
        self.filled += n;
        Ok(n)
    }

    /// Buffered bytes the parser has not consumed yet.
    pub fn unconsumed(&self) -> &[u8] {
        &self.data[self.consumed..self.filled]
    }

    /// Mark `n` more bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(self.consumed + n <= self.filled);
        self.consumed = (self.consumed + n).min(self.filled);
    }

    /// Total bytes filled so far.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    fn grow(&mut self) {
        let new_capacity = self.data.len() * 2;
        self.data.resize(new_capacity, 0);
        tracing::trace!(capacity = new_capacity, "Read buffer grown");
    }
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
