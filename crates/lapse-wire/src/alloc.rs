use std::fmt;
use std::sync::Arc;

/// An allocation request the allocator could not satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    pub len: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to allocate {} bytes", self.len)
    }
}

impl std::error::Error for AllocError {}

/// Source of every byte buffer the library uses.
///
/// `allocate` must return a zeroed block of exactly `size` bytes. Blocks are
/// handed back through `free` once the library is done with them, so an
/// implementation can pool or account for them. Blocks whose ownership moves
/// to the caller (decoded text) are never returned.
pub trait Allocator: Send + Sync {
    fn allocate(&self, size: usize) -> Result<Box<[u8]>, AllocError>;

    fn free(&self, block: Box<[u8]>);
}

/// Heap-backed allocator used when nothing else is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAllocator;

impl Allocator for DefaultAllocator {
    fn allocate(&self, size: usize) -> Result<Box<[u8]>, AllocError> {
        let mut block = Vec::new();
        block
            .try_reserve_exact(size)
            .map_err(|_| AllocError { len: size })?;
        block.resize(size, 0);
        Ok(block.into_boxed_slice())
    }

    fn free(&self, block: Box<[u8]>) {
        drop(block);
    }
}

pub fn default_allocator() -> Arc<dyn Allocator> {
    Arc::new(DefaultAllocator)
}
