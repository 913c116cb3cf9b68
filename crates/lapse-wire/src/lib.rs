//! Binary serialization engine for lapse captures.
//!
//! A [`WriteStream`] grows geometrically from a 1 KiB first block; a
//! [`ReadStream`] consumes a private copy of its input and reports truncation
//! instead of reading past the end. Every byte buffer comes from an
//! [`Allocator`].
//!
//! The format is host-ABI specific: integers are raw native-endian bytes. A
//! capture starts with [`CAPTURE_MAGIC`], a version and a byte-order tag so a
//! blob from a different build or machine is refused rather than misread.

mod alloc;
mod capture;
mod codec;
mod error;
mod records;
mod stream;

pub use crate::alloc::{AllocError, Allocator, DefaultAllocator, default_allocator};
pub use crate::capture::{
    BYTE_ORDER_BIG, BYTE_ORDER_LITTLE, CAPTURE_MAGIC, CAPTURE_VERSION, CaptureHeader, HEADER_LEN,
    decode_capture, decode_capture_default, encode_capture, host_byte_order,
};
pub use crate::codec::{Decode, Encode, Primitive, count_u32};
pub use crate::error::WireError;
pub use crate::stream::{FIRST_ALLOCATION_SIZE, ReadStream, Stream, WriteStream};
