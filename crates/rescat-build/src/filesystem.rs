//! # Container File Systems
//!
//! Resources that name a file system are written into one `<name>.rfs`
//! container per tree instead of as loose files:
//!
//! ```text
//! "RFS1"
//! varint entry count
//! per entry: varint name length, UTF-8 name, u64 LE offset, u64 LE length
//! data section (offsets are relative to its start)
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rescat_codec::wire::{Reader, Writer};
use rescat_codec::{CodecError, FormatVersion};

use crate::error::{BuildError, BuildResult};
use crate::layout::file_system_file_name;

/// Container signature.
pub const MAGIC: &[u8; 4] = b"RFS1";

/// Field widths follow the varint layout.
const WIRE: FormatVersion = FormatVersion::V1;

/// Accumulates files for one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSystemWriter {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileSystemWriter {
    /// An empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. A repeated name replaces the earlier bytes.
    pub fn add(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(name.into(), bytes);
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Serialize the container.
    pub fn to_bytes(&self) -> BuildResult<Vec<u8>> {
        let mut w = Writer::new(WIRE);
        w.write_bytes(MAGIC);
        w.write_count("file system entries", self.files.len())?;
        let mut offset = 0u64;
        for (name, bytes) in &self.files {
            w.write_count("file system entry name", name.len())?;
            w.write_bytes(name.as_bytes());
            w.write_fixed_u64(offset)?;
            w.write_fixed_u64(bytes.len() as u64)?;
            offset += bytes.len() as u64;
        }
        for bytes in self.files.values() {
            w.write_bytes(bytes);
        }
        Ok(w.into_bytes())
    }

    /// Write `<name>.rfs` into `dir`.
    pub fn write(&self, dir: &Path, name: &str) -> BuildResult<PathBuf> {
        let path = dir.join(file_system_file_name(name));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        std::fs::write(&path, self.to_bytes()?).map_err(|e| BuildError::io(&path, e))?;
        Ok(path)
    }
}

/// A parsed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemArchive {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileSystemArchive {
    /// Parse container bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes, WIRE);
        if r.read_bytes("file system magic", MAGIC.len())? != MAGIC {
            return Err(CodecError::Envelope("missing RFS1 signature".into()));
        }
        let count = r.read_count("file system entries")?;
        let mut index = Vec::with_capacity(count);
        for _ in 0..count {
            let name_len = r.read_count("file system entry name")?;
            let name = std::str::from_utf8(r.read_bytes("file system entry name", name_len)?)
                .map_err(|_| CodecError::InvalidString)?
                .to_string();
            let offset = r.read_fixed_u64("file system entry offset")?;
            let length = r.read_fixed_u64("file system entry length")?;
            index.push((name, offset, length));
        }
        let data = r.read_bytes("file system data", r.remaining())?;
        let mut files = BTreeMap::new();
        for (name, offset, length) in index {
            let range = usize::try_from(offset)
                .ok()
                .zip(usize::try_from(length).ok())
                .and_then(|(start, len)| Some(start..start.checked_add(len)?))
                .filter(|range| range.end <= data.len())
                .ok_or_else(|| CodecError::LengthOutOfBounds {
                    what: "file system entry",
                    claimed: offset.saturating_add(length),
                    remaining: data.len() as u64,
                })?;
            files.insert(name, data[range].to_vec());
        }
        Ok(Self { files })
    }

    /// Read and parse a container file.
    pub fn read(path: &Path) -> BuildResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| BuildError::io(path, e))?;
        Ok(Self::parse(&bytes)?)
    }

    /// Bytes of a file.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// File names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
