//! # Wire Primitives
//!
//! Version-aware binary writer and reader shared by every list kind.
//!
//! - `int` fields are fixed 4-byte little-endian in V0 and 7-bit varints
//!   (low group first, high bit = continuation) from V1 on.
//! - `long` fields are fixed 8-byte little-endian in V0 and varints after.
//! - Hashes are always fixed 4-byte little-endian.
//! - Strings are a length field followed by XOR ciphertext. The length
//!   field holds `0` for a null string and `byte_len + 1` otherwise, so
//!   null and empty stay distinct. V0 uses one byte for the field, later
//!   versions a varint.
//!
//! The reader bounds-checks every length and count against the bytes that
//! remain before allocating, so a wrong key or a truncated file surfaces
//! as an error rather than a huge allocation or a panic.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rescat_core::{ContentHash, LoadType};

use crate::cipher::{self, StringKey, KEY_LENGTH};
use crate::error::CodecError;
use crate::version::FormatVersion;

/// Largest value of a V0 one-byte string length field.
const V0_STRING_FIELD_MAX: u64 = u8::MAX as u64;

/// Largest value of a varint string length field.
const VARINT_STRING_FIELD_MAX: u64 = u32::MAX as u64;

// ---------------------------------------------------------------------------
// Varints
// ---------------------------------------------------------------------------

/// Append a 7-bit varint encoding of `value`.
pub fn write_varint_u64(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Append a 7-bit varint encoding of a 32-bit `value`.
pub fn write_varint_u32(buf: &mut Vec<u8>, value: u32) {
    write_varint_u64(buf, u64::from(value));
}

fn read_varint(input: &mut impl Read, bits: u32, what: &'static str) -> Result<u64, CodecError> {
    let max_bytes = bits.div_ceil(7);
    let mut result: u64 = 0;
    for i in 0..max_bytes {
        let byte = input
            .read_u8()
            .map_err(|_| CodecError::UnexpectedEof(what))?;
        let shift = 7 * i;
        let chunk = u64::from(byte & 0x7f);
        if i == max_bytes - 1 {
            // The last group may only carry the bits left in the target width.
            let remaining_bits = bits - shift;
            if byte & 0x80 != 0 || chunk >> remaining_bits != 0 {
                return Err(CodecError::VarintOverflow(bits));
            }
        }
        result |= chunk << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(CodecError::VarintOverflow(bits))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Version-aware binary writer.
#[derive(Debug)]
pub struct Writer {
    buf: Vec<u8>,
    version: FormatVersion,
}

impl Writer {
    /// Create an empty writer for a format version.
    pub fn new(version: FormatVersion) -> Self {
        Self {
            buf: Vec::new(),
            version,
        }
    }

    /// The format version being written.
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Write the raw 4 key bytes (the file salt).
    pub fn write_key(&mut self, key: &StringKey) {
        self.buf.extend_from_slice(key.as_bytes());
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) -> Result<(), CodecError> {
        self.buf.write_u8(value)?;
        Ok(())
    }

    /// Write a load type tag.
    pub fn write_load_type(&mut self, load_type: LoadType) -> Result<(), CodecError> {
        self.write_u8(load_type.tag())
    }

    /// Write a fixed 4-byte hash.
    pub fn write_hash(&mut self, hash: ContentHash) -> Result<(), CodecError> {
        self.buf.write_u32::<LittleEndian>(hash.as_u32())?;
        Ok(())
    }

    /// Write an `int` field.
    pub fn write_int(&mut self, value: u32) -> Result<(), CodecError> {
        if self.version.uses_varint() {
            write_varint_u32(&mut self.buf, value);
        } else {
            self.buf.write_u32::<LittleEndian>(value)?;
        }
        Ok(())
    }

    /// Write a collection size as an `int` field.
    pub fn write_count(&mut self, what: &'static str, count: usize) -> Result<(), CodecError> {
        let value = u32::try_from(count).map_err(|_| CodecError::Capacity {
            what,
            value: count as u64,
            max: u64::from(u32::MAX),
        })?;
        self.write_int(value)
    }

    /// Write a `long` field.
    pub fn write_long(&mut self, value: u64) -> Result<(), CodecError> {
        if self.version.uses_varint() {
            write_varint_u64(&mut self.buf, value);
        } else {
            self.buf.write_u64::<LittleEndian>(value)?;
        }
        Ok(())
    }

    /// Write a fixed 8-byte little-endian value regardless of version.
    pub fn write_fixed_u64(&mut self, value: u64) -> Result<(), CodecError> {
        self.buf.write_u64::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a resource group member index: a fixed 2-byte value in V0,
    /// an `int` field otherwise.
    pub fn write_group_index(&mut self, index: u32) -> Result<(), CodecError> {
        if self.version.uses_varint() {
            return self.write_int(index);
        }
        let narrow = u16::try_from(index).map_err(|_| CodecError::Capacity {
            what: "resource group index",
            value: u64::from(index),
            max: u64::from(u16::MAX),
        })?;
        self.buf.write_u16::<LittleEndian>(narrow)?;
        Ok(())
    }

    /// Write a sequence of `int` indices prefixed by its count.
    pub fn write_indexes(&mut self, what: &'static str, indexes: &[u32]) -> Result<(), CodecError> {
        self.write_count(what, indexes.len())?;
        for index in indexes {
            self.write_int(*index)?;
        }
        Ok(())
    }

    /// Write an encrypted, length-prefixed string.
    pub fn write_string(&mut self, value: Option<&str>, key: &StringKey) -> Result<(), CodecError> {
        let Some(value) = value else {
            return self.write_string_field(0);
        };
        let bytes = value.as_bytes();
        let field_max = if self.version.uses_varint() {
            VARINT_STRING_FIELD_MAX
        } else {
            V0_STRING_FIELD_MAX
        };
        let field = bytes.len() as u64 + 1;
        if field > field_max {
            return Err(CodecError::Capacity {
                what: "string length",
                value: bytes.len() as u64,
                max: field_max - 1,
            });
        }
        self.write_string_field(field)?;
        let start = self.buf.len();
        self.buf.extend_from_slice(bytes);
        cipher::xor_in_place(&mut self.buf[start..], key.as_bytes());
        Ok(())
    }

    fn write_string_field(&mut self, field: u64) -> Result<(), CodecError> {
        if self.version.uses_varint() {
            write_varint_u64(&mut self.buf, field);
            Ok(())
        } else {
            // Callers keep V0 fields below 256.
            self.write_u8(field as u8)
        }
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Version-aware binary reader over a byte slice.
#[derive(Debug)]
pub struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
    version: FormatVersion,
}

impl<'a> Reader<'a> {
    /// Create a reader for a format version.
    pub fn new(bytes: &'a [u8], version: FormatVersion) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            version,
        }
    }

    /// The format version being read.
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    /// Fail if any bytes remain.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }

    /// Read the raw 4 key bytes (the file salt).
    pub fn read_key(&mut self) -> Result<StringKey, CodecError> {
        let mut bytes = [0u8; KEY_LENGTH];
        self.cursor
            .read_exact(&mut bytes)
            .map_err(|_| CodecError::UnexpectedEof("salt"))?;
        Ok(StringKey::new(bytes))
    }

    /// Borrow `len` raw bytes.
    pub fn read_bytes(&mut self, what: &'static str, len: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(CodecError::LengthOutOfBounds {
                what,
                claimed: len as u64,
                remaining: remaining as u64,
            });
        }
        let data: &'a [u8] = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    /// Read a single byte.
    pub fn read_u8(&mut self, what: &'static str) -> Result<u8, CodecError> {
        self.cursor
            .read_u8()
            .map_err(|_| CodecError::UnexpectedEof(what))
    }

    /// Read a load type tag.
    pub fn read_load_type(&mut self) -> Result<LoadType, CodecError> {
        let tag = self.read_u8("load type")?;
        LoadType::from_tag(tag).ok_or(CodecError::UnknownLoadType(tag))
    }

    /// Read a fixed 4-byte hash.
    pub fn read_hash(&mut self, what: &'static str) -> Result<ContentHash, CodecError> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map(ContentHash::from_u32)
            .map_err(|_| CodecError::UnexpectedEof(what))
    }

    /// Read an `int` field.
    pub fn read_int(&mut self, what: &'static str) -> Result<u32, CodecError> {
        if self.version.uses_varint() {
            read_varint(&mut self.cursor, 32, what).map(|v| v as u32)
        } else {
            self.cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| CodecError::UnexpectedEof(what))
        }
    }

    /// Read a collection size. Every element occupies at least one byte,
    /// so a count larger than the remaining input is rejected up front.
    pub fn read_count(&mut self, what: &'static str) -> Result<usize, CodecError> {
        let count = self.read_int(what)? as usize;
        let remaining = self.remaining();
        if count > remaining {
            return Err(CodecError::LengthOutOfBounds {
                what,
                claimed: count as u64,
                remaining: remaining as u64,
            });
        }
        Ok(count)
    }

    /// Read a `long` field.
    pub fn read_long(&mut self, what: &'static str) -> Result<u64, CodecError> {
        if self.version.uses_varint() {
            read_varint(&mut self.cursor, 64, what)
        } else {
            self.read_fixed_u64(what)
        }
    }

    /// Read a fixed 8-byte little-endian value regardless of version.
    pub fn read_fixed_u64(&mut self, what: &'static str) -> Result<u64, CodecError> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| CodecError::UnexpectedEof(what))
    }

    /// Read a resource group member index.
    pub fn read_group_index(&mut self) -> Result<u32, CodecError> {
        if self.version.uses_varint() {
            return self.read_int("resource group index");
        }
        self.cursor
            .read_u16::<LittleEndian>()
            .map(u32::from)
            .map_err(|_| CodecError::UnexpectedEof("resource group index"))
    }

    /// Read a count-prefixed sequence of `int` indices.
    pub fn read_indexes(&mut self, what: &'static str) -> Result<Vec<u32>, CodecError> {
        let count = self.read_count(what)?;
        let mut indexes = Vec::with_capacity(count);
        for _ in 0..count {
            indexes.push(self.read_int(what)?);
        }
        Ok(indexes)
    }

    /// Read an encrypted, length-prefixed string. `None` is a null string.
    pub fn read_string(
        &mut self,
        what: &'static str,
        key: &StringKey,
    ) -> Result<Option<String>, CodecError> {
        let field = if self.version.uses_varint() {
            read_varint(&mut self.cursor, 32, what)?
        } else {
            u64::from(self.read_u8(what)?)
        };
        if field == 0 {
            return Ok(None);
        }
        let len = field - 1;
        let remaining = self.remaining() as u64;
        if len > remaining {
            return Err(CodecError::LengthOutOfBounds {
                what,
                claimed: len,
                remaining,
            });
        }
        let mut bytes = vec![0u8; len as usize];
        self.cursor
            .read_exact(&mut bytes)
            .map_err(|_| CodecError::UnexpectedEof(what))?;
        cipher::xor_in_place(&mut bytes, key.as_bytes());
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| CodecError::InvalidString)
    }

    /// Read a string that must not be null.
    pub fn read_required_string(
        &mut self,
        what: &'static str,
        key: &StringKey,
    ) -> Result<String, CodecError> {
        self.read_string(what, key)?
            .ok_or_else(|| CodecError::InvalidList(format!("{what} is null")))
    }
}
