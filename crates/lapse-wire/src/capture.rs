use std::sync::Arc;

use lapse_types::ThreadRecord;

use crate::alloc::{Allocator, default_allocator};
use crate::codec::{Decode, Encode};
use crate::error::WireError;
use crate::stream::{ReadStream, WriteStream};

pub const CAPTURE_MAGIC: [u8; 4] = *b"LPSE";
pub const CAPTURE_VERSION: u16 = 1;
pub const BYTE_ORDER_LITTLE: u8 = 1;
pub const BYTE_ORDER_BIG: u8 = 2;
pub const HEADER_LEN: usize = 8;

pub fn host_byte_order() -> u8 {
    if cfg!(target_endian = "little") {
        BYTE_ORDER_LITTLE
    } else {
        BYTE_ORDER_BIG
    }
}

/// Leading bytes of every capture: magic, format version, byte-order tag and
/// one reserved byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureHeader {
    pub version: u16,
    pub byte_order: u8,
}

impl CaptureHeader {
    pub fn current() -> Self {
        Self {
            version: CAPTURE_VERSION,
            byte_order: host_byte_order(),
        }
    }
}

impl Encode for CaptureHeader {
    fn encode(&self, stream: &mut WriteStream) -> Result<(), WireError> {
        stream.serialize_bytes(&CAPTURE_MAGIC)?;
        stream.write_primitive(self.version)?;
        stream.write_primitive(self.byte_order)?;
        stream.write_primitive(0u8)
    }
}

impl Decode for CaptureHeader {
    const MIN_ENCODED_LEN: usize = HEADER_LEN;

    fn decode(stream: &mut ReadStream) -> Result<Self, WireError> {
        let mut magic = [0u8; 4];
        stream.serialize_bytes(&mut magic)?;
        if magic != CAPTURE_MAGIC {
            return Err(WireError::MagicMismatch {
                expected: CAPTURE_MAGIC,
                actual: magic,
            });
        }

        let version: u16 = stream.read_primitive()?;
        let byte_order: u8 = stream.read_primitive()?;
        let _reserved: u8 = stream.read_primitive()?;

        // Checked before the version: a foreign byte order scrambles it.
        let host = host_byte_order();
        if byte_order != host {
            return Err(WireError::ByteOrderMismatch {
                expected: host,
                actual: byte_order,
            });
        }
        if version != CAPTURE_VERSION {
            return Err(WireError::UnsupportedVersion(version));
        }

        Ok(Self {
            version,
            byte_order,
        })
    }
}

/// Writes a header followed by every thread, in iteration order.
pub fn encode_capture<'a>(
    stream: &mut WriteStream,
    threads: impl IntoIterator<Item = &'a ThreadRecord>,
) -> Result<(), WireError> {
    CaptureHeader::current().encode(stream)?;
    for thread in threads {
        thread.encode(stream)?;
    }
    Ok(())
}

/// Reads a whole capture back. Thread records run until the end of input.
pub fn decode_capture(
    allocator: Arc<dyn Allocator>,
    bytes: &[u8],
) -> Result<Vec<ThreadRecord>, WireError> {
    let mut stream = ReadStream::new(allocator, bytes)?;
    CaptureHeader::decode(&mut stream)?;

    let mut threads = Vec::new();
    while !stream.is_exhausted() {
        threads.push(ThreadRecord::decode(&mut stream)?);
    }
    Ok(threads)
}

pub fn decode_capture_default(bytes: &[u8]) -> Result<Vec<ThreadRecord>, WireError> {
    decode_capture(default_allocator(), bytes)
}
