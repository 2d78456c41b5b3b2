//! # Codec Errors
//!
//! Errors raised while encoding or decoding version lists. Capacity errors
//! are fatal: the codec never truncates a string or an index to make it fit
//! a narrower field.

use thiserror::Error;

use crate::resolver::ResolveError;

/// Errors from version list encoding and decoding.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A value does not fit the field the format version reserves for it.
    #[error("capacity exceeded: {what} is {value}, format allows at most {max}")]
    Capacity {
        /// What overflowed (e.g. "string length", "resource count").
        what: &'static str,
        /// The offending value.
        value: u64,
        /// The largest value the field can hold.
        max: u64,
    },

    /// The input ended in the middle of a field.
    #[error("unexpected end of data while reading {0}")]
    UnexpectedEof(&'static str),

    /// A length or count field claims more data than remains.
    #[error("{what} of {claimed} exceeds the {remaining} bytes remaining")]
    LengthOutOfBounds {
        /// The field being read.
        what: &'static str,
        /// The value the field claims.
        claimed: u64,
        /// Bytes actually remaining.
        remaining: u64,
    },

    /// A decrypted string is not valid UTF-8. Usually a wrong key.
    #[error("decrypted string is not valid UTF-8 (wrong key or corrupt data)")]
    InvalidString,

    /// A varint ran past the width of its target type.
    #[error("variable-length integer overflows {0} bits")]
    VarintOverflow(u32),

    /// An index refers past the end of its table.
    #[error("{table} index {index} out of range (table has {len} entries)")]
    IndexOutOfRange {
        /// The table being indexed.
        table: &'static str,
        /// The offending index.
        index: u32,
        /// The table length.
        len: usize,
    },

    /// An unknown load type tag.
    #[error("unknown load type tag {0}")]
    UnknownLoadType(u8),

    /// The list violates a structural invariant and cannot be encoded.
    #[error("invalid version list: {0}")]
    InvalidList(String),

    /// Bytes remain after the last table.
    #[error("{0} trailing bytes after version list")]
    TrailingBytes(usize),

    /// Asset index resolution failed.
    #[error("index resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// The file envelope is malformed.
    #[error("envelope error: {0}")]
    Envelope(String),

    /// I/O error from the underlying buffer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Whether this is a capacity error.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity { .. })
    }
}
