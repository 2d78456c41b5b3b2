//! # Resource Pack Writer
//!
//! Concatenates compressed payloads into one blob and prefixes it with an
//! enveloped ResourcePack list. The data offset is a fixed-width field, so
//! encoding twice with the same salt yields the final header length.

use std::path::Path;

use rescat_codec::envelope::{self, HEADER_LEN};
use rescat_codec::{
    random_salt, FileSystemEntry, FormatVersion, PackedResource, ResourceEntry,
    ResourcePackVersionList, VersionListCodec,
};
use rescat_core::ContentHash;

use crate::error::{BuildError, BuildResult};

/// Builds one `.rpk` file.
#[derive(Debug, Clone, Default)]
pub struct ResourcePackBuilder {
    resources: Vec<PackedResource>,
    blob: Vec<u8>,
    file_systems: Vec<FileSystemEntry>,
}

impl ResourcePackBuilder {
    /// An empty pack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource with its stored bytes.
    pub fn add(&mut self, entry: ResourceEntry, stored: &[u8]) -> BuildResult<()> {
        let compressed_length = u32::try_from(stored.len()).map_err(|_| {
            BuildError::Capacity(rescat_codec::CodecError::Capacity {
                what: "resource pack entry length",
                value: stored.len() as u64,
                max: u64::from(u32::MAX),
            })
        })?;
        self.resources.push(PackedResource {
            entry,
            offset: self.blob.len() as u64,
            compressed_length,
            compressed_hash: ContentHash::of(stored),
        });
        self.blob.extend_from_slice(stored);
        Ok(())
    }

    /// Attach the file system table (V2 only).
    pub fn with_file_systems(mut self, file_systems: Vec<FileSystemEntry>) -> Self {
        self.file_systems = file_systems;
        self
    }

    /// Number of resources added.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether nothing was added.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Encode the whole file: envelope, header list, data blob.
    pub fn build(self, version: FormatVersion) -> BuildResult<Vec<u8>> {
        let mut list = ResourcePackVersionList {
            data_offset: 0,
            data_length: self.blob.len() as u64,
            data_hash: ContentHash::of(&self.blob),
            resources: self.resources,
            file_systems: self.file_systems,
        };
        let salt = random_salt();
        let header_len = list.encode(version, &salt)?.len();
        list.data_offset = (HEADER_LEN + header_len) as u64;

        let mut out = envelope::write_with_salt(&list, version, &salt)?;
        debug_assert_eq!(out.len() as u64, list.data_offset);
        out.extend_from_slice(&self.blob);
        Ok(out)
    }

    /// Build and write to `path`, creating parent directories.
    pub fn write(self, path: &Path, version: FormatVersion) -> BuildResult<()> {
        let bytes = self.build(version)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        std::fs::write(path, bytes).map_err(|e| BuildError::io(path, e))
    }
}

/// Split a `.rpk` file into its list and data blob, checking the blob hash.
pub fn open_resource_pack(bytes: &[u8]) -> BuildResult<(ResourcePackVersionList, &[u8])> {
    let (list, _) = envelope::read::<ResourcePackVersionList>(bytes)?;
    let blob = usize::try_from(list.data_offset)
        .ok()
        .and_then(|start| bytes.get(start..))
        .filter(|blob| blob.len() as u64 == list.data_length)
        .ok_or_else(|| {
            BuildError::Fatal(format!(
                "resource pack blob at {} does not hold {} bytes",
                list.data_offset, list.data_length
            ))
        })?;
    if ContentHash::of(blob) != list.data_hash {
        return Err(BuildError::Fatal("resource pack blob hash mismatch".into()));
    }
    Ok((list, blob))
}
