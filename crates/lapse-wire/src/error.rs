use std::fmt;

use crate::alloc::AllocError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    OutOfMemory { len: usize },
    Truncated { needed: usize, remaining: usize },
    MissingTerminator { len: usize },
    InvalidUtf8 { valid_up_to: usize },
    CountTooLarge { len: usize },
    MagicMismatch { expected: [u8; 4], actual: [u8; 4] },
    ByteOrderMismatch { expected: u8, actual: u8 },
    UnsupportedVersion(u16),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { len } => write!(f, "out of memory allocating {len} bytes"),
            Self::Truncated { needed, remaining } => write!(
                f,
                "truncated input: needed {needed} bytes, {remaining} remaining"
            ),
            Self::MissingTerminator { len } => {
                write!(f, "text of {len} bytes is not nul-terminated")
            }
            Self::InvalidUtf8 { valid_up_to } => {
                write!(f, "text is not valid utf-8 after byte {valid_up_to}")
            }
            Self::CountTooLarge { len } => {
                write!(f, "length {len} does not fit in a 32-bit count")
            }
            Self::MagicMismatch { expected, actual } => write!(
                f,
                "capture magic mismatch: expected {:?}, got {:?}",
                expected.escape_ascii().to_string(),
                actual.escape_ascii().to_string()
            ),
            Self::ByteOrderMismatch { expected, actual } => write!(
                f,
                "capture byte order mismatch: host tag {expected}, capture tag {actual}"
            ),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported capture format version {version}")
            }
        }
    }
}

impl std::error::Error for WireError {}

impl From<AllocError> for WireError {
    fn from(value: AllocError) -> Self {
        Self::OutOfMemory { len: value.len }
    }
}
