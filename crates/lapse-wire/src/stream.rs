use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::alloc::Allocator;
use crate::error::WireError;

/// Capacity of the first block a growing stream asks for.
pub const FIRST_ALLOCATION_SIZE: usize = 1024;

/// Byte buffer obtained from an [`Allocator`], with a size and a cursor.
///
/// `offset <= size` at all times. The buffer is handed back to the allocator
/// on [`Stream::clear`] and on drop.
pub struct Stream {
    allocator: Arc<dyn Allocator>,
    buffer: Option<Box<[u8]>>,
    size: usize,
    offset: usize,
}

impl Stream {
    pub fn new(allocator: Arc<dyn Allocator>) -> Self {
        Self {
            allocator,
            buffer: None,
            size: 0,
            offset: 0,
        }
    }

    /// Copies `bytes` into a block of exactly `bytes.len()` bytes.
    pub fn with_contents(allocator: Arc<dyn Allocator>, bytes: &[u8]) -> Result<Self, WireError> {
        let mut stream = Self::new(allocator);
        if bytes.is_empty() {
            return Ok(stream);
        }
        let mut block = stream.allocate_block(bytes.len())?;
        block.copy_from_slice(bytes);
        stream.buffer = Some(block);
        stream.size = bytes.len();
        Ok(stream)
    }

    /// The whole buffer, or `None` before the first allocation.
    pub fn data(&self) -> Option<&[u8]> {
        self.buffer.as_deref()
    }

    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        self.buffer.as_deref_mut()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    /// Doubles the capacity, or allocates [`FIRST_ALLOCATION_SIZE`] bytes when
    /// there is no buffer yet. The previous capacity is copied over in full.
    pub fn resize(&mut self) -> Result<(), WireError> {
        let alloc_size = if self.size > 0 {
            self.size
                .checked_mul(2)
                .ok_or(WireError::OutOfMemory { len: usize::MAX })?
        } else {
            FIRST_ALLOCATION_SIZE
        };

        let mut block = self.allocate_block(alloc_size)?;
        if let Some(previous) = self.buffer.take() {
            block[..self.size].copy_from_slice(&previous[..self.size]);
            self.allocator.free(previous);
        }

        self.buffer = Some(block);
        self.size = alloc_size;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.size = 0;
        self.offset = 0;
        if let Some(buffer) = self.buffer.take() {
            self.allocator.free(buffer);
        }
    }

    pub(crate) fn allocate_block(&self, len: usize) -> Result<Box<[u8]>, WireError> {
        let block = self.allocator.allocate(len)?;
        if block.len() != len {
            // A short block would break the size bookkeeping; give it back.
            self.allocator.free(block);
            return Err(WireError::OutOfMemory { len });
        }
        Ok(block)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("allocated", &self.buffer.is_some())
            .field("size", &self.size)
            .field("offset", &self.offset)
            .finish()
    }
}

/// Append-only stream. `size` is the capacity, `offset` the bytes written.
#[derive(Debug)]
pub struct WriteStream {
    stream: Stream,
}

impl WriteStream {
    pub fn new(allocator: Arc<dyn Allocator>) -> Self {
        Self {
            stream: Stream::new(allocator),
        }
    }

    /// Appends `bytes`, growing first as many times as needed.
    pub fn serialize_bytes(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        if bytes.is_empty() {
            return Ok(());
        }
        while self.stream.size - self.stream.offset < bytes.len() {
            self.stream.resize()?;
        }

        let start = self.stream.offset;
        let end = start + bytes.len();
        let Some(buffer) = self.stream.buffer.as_deref_mut() else {
            return Err(WireError::OutOfMemory { len: end });
        };
        buffer[start..end].copy_from_slice(bytes);
        self.stream.offset = end;
        Ok(())
    }

    /// The bytes written so far.
    pub fn written(&self) -> &[u8] {
        match self.stream.buffer.as_deref() {
            Some(buffer) => &buffer[..self.stream.offset],
            None => &[],
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.written().to_vec()
    }
}

impl Deref for WriteStream {
    type Target = Stream;

    fn deref(&self) -> &Stream {
        &self.stream
    }
}

impl DerefMut for WriteStream {
    fn deref_mut(&mut self) -> &mut Stream {
        &mut self.stream
    }
}

/// Sequential reader over a private copy of a caller-supplied buffer.
/// `size` is the number of readable bytes, `offset` the cursor.
#[derive(Debug)]
pub struct ReadStream {
    stream: Stream,
}

impl ReadStream {
    pub fn new(allocator: Arc<dyn Allocator>, bytes: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            stream: Stream::with_contents(allocator, bytes)?,
        })
    }

    /// Fills `out` from the cursor. Fails without moving the cursor when
    /// fewer than `out.len()` bytes remain.
    pub fn serialize_bytes(&mut self, out: &mut [u8]) -> Result<(), WireError> {
        self.ensure_remaining(out.len())?;
        if out.is_empty() {
            return Ok(());
        }

        let start = self.stream.offset;
        let end = start + out.len();
        let Some(buffer) = self.stream.buffer.as_deref() else {
            return Err(WireError::Truncated {
                needed: out.len(),
                remaining: 0,
            });
        };
        out.copy_from_slice(&buffer[start..end]);
        self.stream.offset = end;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.stream.size - self.stream.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn ensure_remaining(&self, needed: usize) -> Result<(), WireError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(WireError::Truncated { needed, remaining });
        }
        Ok(())
    }
}

impl Deref for ReadStream {
    type Target = Stream;

    fn deref(&self) -> &Stream {
        &self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{AllocError, DefaultAllocator, default_allocator};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingAllocator {
        live: AtomicUsize,
        total: AtomicUsize,
    }

    impl Allocator for CountingAllocator {
        fn allocate(&self, size: usize) -> Result<Box<[u8]>, AllocError> {
            self.live.fetch_add(1, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
            DefaultAllocator.allocate(size)
        }

        fn free(&self, block: Box<[u8]>) {
            self.live.fetch_sub(1, Ordering::SeqCst);
            DefaultAllocator.free(block);
        }
    }

    struct ExhaustedAllocator;

    impl Allocator for ExhaustedAllocator {
        fn allocate(&self, size: usize) -> Result<Box<[u8]>, AllocError> {
            Err(AllocError { len: size })
        }

        fn free(&self, _block: Box<[u8]>) {}
    }

    #[test]
    fn fresh_stream_has_no_buffer() {
        let stream = WriteStream::new(default_allocator());
        assert!(stream.data().is_none());
        assert_eq!(stream.size(), 0);
        assert_eq!(stream.offset(), 0);
        assert!(stream.written().is_empty());
    }

    #[test]
    fn resize_from_empty_allocates_first_block() {
        let mut stream = Stream::new(default_allocator());
        stream.resize().expect("first resize should allocate");
        assert!(stream.data().is_some());
        assert_eq!(stream.size(), 1024);
    }

    #[test]
    fn resize_twice_doubles() {
        let mut stream = Stream::new(default_allocator());
        stream.resize().expect("first resize should allocate");
        assert_eq!(stream.size(), 1024);
        stream.resize().expect("second resize should allocate");
        assert!(stream.data().is_some());
        assert_eq!(stream.size(), 2048);
    }

    #[test]
    fn resize_preserves_existing_bytes() {
        let mut stream = Stream::new(default_allocator());
        stream.resize().expect("first resize should allocate");
        stream
            .data_mut()
            .expect("buffer after resize")[..4]
            .copy_from_slice(b"allo");

        stream.resize().expect("second resize should allocate");

        let data = stream.data().expect("buffer after second resize");
        assert_eq!(stream.size(), 2048);
        assert_eq!(&data[..4], b"allo");
    }

    #[test]
    fn writes_grow_until_they_fit() {
        let mut stream = WriteStream::new(default_allocator());
        let payload = vec![0xAB; 5000];
        stream.serialize_bytes(&payload).expect("large write");
        assert_eq!(stream.size(), 8192);
        assert_eq!(stream.offset(), 5000);
        assert_eq!(stream.written(), payload.as_slice());
    }

    #[test]
    fn appends_are_contiguous_across_growth() {
        let mut stream = WriteStream::new(default_allocator());
        stream.serialize_bytes(&[1; 1000]).expect("first write");
        stream.serialize_bytes(&[2; 100]).expect("second write triggers growth");
        let written = stream.written();
        assert_eq!(written.len(), 1100);
        assert!(written[..1000].iter().all(|b| *b == 1));
        assert!(written[1000..].iter().all(|b| *b == 2));
    }

    #[test]
    fn clear_and_drop_return_every_block() {
        let allocator = Arc::new(CountingAllocator::default());
        {
            let mut stream = WriteStream::new(allocator.clone());
            stream.serialize_bytes(&[7; 3000]).expect("write");
            assert_eq!(allocator.live.load(Ordering::SeqCst), 1);
            stream.clear();
            assert_eq!(stream.size(), 0);
            assert_eq!(stream.offset(), 0);
            assert_eq!(allocator.live.load(Ordering::SeqCst), 0);
            stream.serialize_bytes(&[7; 10]).expect("write after clear");
        }
        assert_eq!(allocator.live.load(Ordering::SeqCst), 0);
        // 1024, 2048, 4096, then 1024 again after clear.
        assert_eq!(allocator.total.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn allocation_failure_is_reported() {
        let mut stream = WriteStream::new(Arc::new(ExhaustedAllocator));
        let err = stream
            .serialize_bytes(b"x")
            .expect_err("allocator refuses every request");
        assert_eq!(err, WireError::OutOfMemory { len: 1024 });
        assert_eq!(stream.offset(), 0);
    }

    #[test]
    fn read_stream_copies_and_consumes() {
        let source = [1u8, 2, 3, 4, 5];
        let mut stream = ReadStream::new(default_allocator(), &source).expect("copy input");
        assert_eq!(stream.size(), 5);

        let mut head = [0u8; 3];
        stream.serialize_bytes(&mut head).expect("read head");
        assert_eq!(head, [1, 2, 3]);
        assert_eq!(stream.offset(), 3);
        assert_eq!(stream.remaining(), 2);
    }

    #[test]
    fn read_past_end_is_truncated_and_keeps_cursor() {
        let mut stream = ReadStream::new(default_allocator(), &[9, 9]).expect("copy input");
        let mut out = [0u8; 4];
        let err = stream
            .serialize_bytes(&mut out)
            .expect_err("only two bytes are available");
        assert_eq!(
            err,
            WireError::Truncated {
                needed: 4,
                remaining: 2
            }
        );
        assert_eq!(stream.offset(), 0);
    }

    #[test]
    fn empty_read_stream_is_exhausted() {
        let stream = ReadStream::new(default_allocator(), &[]).expect("empty input");
        assert!(stream.is_exhausted());
        assert!(stream.data().is_none());
    }
}
