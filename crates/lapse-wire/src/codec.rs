//! Encoding helpers shared by every record type.
//!
//! Three shapes cover the whole format:
//!
//! - fixed-width primitives, written as their raw native-endian bytes;
//! - optional text, a `u32` length counting a trailing nul (0 means absent)
//!   followed by the bytes and the nul;
//! - ordered sequences, a `u32` element count followed by each element.

use std::mem::size_of;

use crate::error::WireError;
use crate::stream::{ReadStream, WriteStream};

pub trait Encode {
    fn encode(&self, stream: &mut WriteStream) -> Result<(), WireError>;
}

pub trait Decode: Sized {
    /// Lower bound on the encoded size of one value, used to reject element
    /// counts that cannot fit in the remaining input.
    const MIN_ENCODED_LEN: usize = 0;

    fn decode(stream: &mut ReadStream) -> Result<Self, WireError>;
}

mod sealed {
    pub trait Sealed {}
}

/// Integer types with a fixed in-memory width.
pub trait Primitive: sealed::Sealed + Copy {
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    fn to_ne(self) -> Self::Bytes;

    fn from_ne(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Primitive for $ty {
                type Bytes = [u8; size_of::<$ty>()];

                fn to_ne(self) -> Self::Bytes {
                    self.to_ne_bytes()
                }

                fn from_ne(bytes: Self::Bytes) -> Self {
                    <$ty>::from_ne_bytes(bytes)
                }
            }

            impl Encode for $ty {
                fn encode(&self, stream: &mut WriteStream) -> Result<(), WireError> {
                    stream.write_primitive(*self)
                }
            }

            impl Decode for $ty {
                const MIN_ENCODED_LEN: usize = size_of::<$ty>();

                fn decode(stream: &mut ReadStream) -> Result<Self, WireError> {
                    stream.read_primitive()
                }
            }
        )*
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Length of `len` items as a 32-bit count.
pub fn count_u32(len: usize) -> Result<u32, WireError> {
    u32::try_from(len).map_err(|_| WireError::CountTooLarge { len })
}

impl WriteStream {
    pub fn write_primitive<T: Primitive>(&mut self, value: T) -> Result<(), WireError> {
        self.serialize_bytes(value.to_ne().as_ref())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), WireError> {
        self.write_primitive(value)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), WireError> {
        self.write_primitive(value)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), WireError> {
        self.write_primitive(value)
    }

    pub fn write_text(&mut self, text: Option<&str>) -> Result<(), WireError> {
        let Some(text) = text else {
            return self.write_u32(0);
        };
        let len = count_u32(text.len().saturating_add(1))?;
        self.write_u32(len)?;
        self.serialize_bytes(text.as_bytes())?;
        self.serialize_bytes(&[0])
    }

    pub fn write_seq<T: Encode>(&mut self, items: &[T]) -> Result<(), WireError> {
        self.write_u32(count_u32(items.len())?)?;
        for item in items {
            item.encode(self)?;
        }
        Ok(())
    }
}

impl ReadStream {
    pub fn read_primitive<T: Primitive>(&mut self) -> Result<T, WireError> {
        let mut bytes = T::Bytes::default();
        self.serialize_bytes(bytes.as_mut())?;
        Ok(T::from_ne(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        self.read_primitive()
    }

    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        self.read_primitive()
    }

    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        self.read_primitive()
    }

    /// Reads optional text. The returned string owns its allocation.
    pub fn read_text(&mut self) -> Result<Option<String>, WireError> {
        let len = self.read_u32()? as usize;
        if len == 0 {
            return Ok(None);
        }
        self.ensure_remaining(len)?;

        let mut block = self.allocate_block(len)?;
        self.serialize_bytes(&mut block)?;

        let mut bytes = Vec::from(block);
        if bytes.pop() != Some(0) {
            return Err(WireError::MissingTerminator { len });
        }
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|err| WireError::InvalidUtf8 {
                valid_up_to: err.utf8_error().valid_up_to(),
            })
    }

    pub fn read_seq<T: Decode>(&mut self) -> Result<Vec<T>, WireError> {
        let count = self.read_u32()? as usize;
        let min_len = count.saturating_mul(T::MIN_ENCODED_LEN);
        self.ensure_remaining(min_len)?;

        let mut items = Vec::new();
        items
            .try_reserve_exact(count)
            .map_err(|_| WireError::OutOfMemory {
                len: count.saturating_mul(size_of::<T>()),
            })?;
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }
}
