//! Byte-sink abstractions shared by the codecs and the HTTP framer.
//!
//! Codecs write into something that isn't necessarily a `Vec<u8>` — a
//! fixed-capacity stack buffer for small responses, a growable heap buffer
//! for the common case, or a streaming sink that flushes chunks to a
//! transport as they're produced. All three implement the same trait so
//! codec code never needs to know which one it has.

use crate::error::Result;

/// A byte sink a codec can append to and later read back.
pub trait Buffer {
    /// Appends `bytes` to the end of the buffer.
    ///
    /// # Errors
    /// Buffers with a fixed capacity silently truncate writes that would
    /// overflow it rather than erroring; the `Result` exists for sinks
    /// (e.g. [`StreamingBuffer`]) whose flush can genuinely fail.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Number of bytes written so far.
    fn len(&self) -> usize;

    /// Whether no bytes have been written yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bytes written so far, for buffers that retain their content.
    ///
    /// Streaming buffers that flush eagerly may not retain earlier chunks;
    /// callers that need the full content should use a retaining buffer.
    fn as_bytes(&self) -> &[u8];
}

/// A stack-allocated buffer of fixed capacity `N`. Writes past capacity are
/// silently truncated rather than erroring or panicking.
#[derive(Debug)]
pub struct FixedBuffer<const N: usize> {
    data: [u8; N],
    len: usize,
}

impl<const N: usize> FixedBuffer<N> {
    /// An empty buffer of capacity `N`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [0; N],
            len: 0,
        }
    }

    /// Total capacity in bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for FixedBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Buffer for FixedBuffer<N> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let available = N - self.len;
        let taken = bytes.len().min(available);
        let end = self.len + taken;
        self.data[self.len..end].copy_from_slice(&bytes[..taken]);
        self.len = end;
        Ok(())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

/// A growable heap buffer with no fixed capacity. The common case for
/// building up a complete request or response in memory.
#[derive(Debug, Default)]
pub struct ExpandingBuffer {
    data: Vec<u8>,
}

impl ExpandingBuffer {
    /// An empty buffer with no preallocated capacity.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// An empty buffer that preallocates `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Consumes the buffer, returning the accumulated bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl Buffer for ExpandingBuffer {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// A buffer that flushes completed chunks to a closure rather than
/// retaining them, for streaming large responses without holding the whole
/// thing in memory. A small tail is retained so codecs that need to peek
/// back a few bytes (e.g. to patch a length prefix) still can, up to
/// `retain`.
pub struct StreamingBuffer<F>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    sink: F,
    tail: Vec<u8>,
    retain: usize,
    total_len: usize,
}

impl<F> StreamingBuffer<F>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    /// Builds a streaming buffer that calls `sink` with each chunk as it
    /// is flushed, retaining the last `retain` bytes for lookback.
    pub fn new(sink: F, retain: usize) -> Self {
        Self {
            sink,
            tail: Vec::with_capacity(retain),
            retain,
            total_len: 0,
        }
    }

    /// Forces any retained tail bytes out through the sink. Call once the
    /// caller is done writing and no further lookback is needed.
    ///
    /// # Errors
    /// Propagates whatever the sink closure returns.
    pub fn finish(mut self) -> Result<()> {
        if !self.tail.is_empty() {
            (self.sink)(&self.tail)?;
            self.tail.clear();
        }
        Ok(())
    }
}

impl<F> Buffer for StreamingBuffer<F>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.total_len += bytes.len();
        self.tail.extend_from_slice(bytes);
        if self.tail.len() > self.retain {
            let flush_len = self.tail.len() - self.retain;
            (self.sink)(&self.tail[..flush_len])?;
            self.tail.drain(..flush_len);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.total_len
    }

    fn as_bytes(&self) -> &[u8] {
        &self.tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_buffer_accepts_up_to_capacity() {
        let mut buf = FixedBuffer::<4>::new();
        buf.write(b"ab").unwrap();
        buf.write(b"cd").unwrap();
        assert_eq!(buf.as_bytes(), b"abcd");
    }

    #[test]
    fn fixed_buffer_truncates_overflow() {
        let mut buf = FixedBuffer::<2>::new();
        assert!(buf.write(b"abc").is_ok());
        assert_eq!(buf.as_bytes(), b"ab");
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn expanding_buffer_grows_without_bound() {
        let mut buf = ExpandingBuffer::new();
        for _ in 0..1000 {
            buf.write(b"x").unwrap();
        }
        assert_eq!(buf.len(), 1000);
    }

    #[test]
    fn streaming_buffer_flushes_beyond_retain_window() {
        let flushed = std::cell::RefCell::new(Vec::new());
        let mut buf = StreamingBuffer::new(
            |chunk: &[u8]| {
                flushed.borrow_mut().extend_from_slice(chunk);
                Ok(())
            },
            2,
        );
        buf.write(b"hello").unwrap();
        buf.write(b"world").unwrap();
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.as_bytes().len(), 2);
        buf.finish().unwrap();
        assert_eq!(&*flushed.borrow(), b"helloworld");
    }
}
