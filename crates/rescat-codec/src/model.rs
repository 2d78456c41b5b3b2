//! # Version List Entries
//!
//! Plain data records shared by every list kind. A decoded list is a
//! snapshot: indexes refer into sibling tables of the same list.

use rescat_core::{ContentHash, LoadType};
use serde::{Deserialize, Serialize};

use crate::cipher::StringKey;
use crate::error::CodecError;
use crate::wire::{Reader, Writer};

/// An asset with its dependencies resolved to asset table indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Logical asset name. The asset table is sorted ordinally by it.
    pub name: String,
    /// Indexes into the asset table, in declared order.
    pub dependency_asset_indexes: Vec<u32>,
}

impl Asset {
    /// Create an asset entry.
    pub fn new(name: impl Into<String>, dependency_asset_indexes: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            dependency_asset_indexes,
        }
    }
}

impl AsRef<str> for Asset {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// The fields every resource record carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Resource name.
    pub name: String,
    /// Optional variant. Null and empty are distinct on the wire.
    pub variant: Option<String>,
    /// Optional file extension override (V1+).
    pub extension: Option<String>,
    /// How the runtime loads the payload.
    pub load_type: LoadType,
    /// Plaintext payload length.
    pub length: u32,
    /// Plaintext payload hash.
    pub hash: ContentHash,
}

impl ResourceEntry {
    /// Create an entry without variant or extension.
    pub fn new(name: impl Into<String>, load_type: LoadType, length: u32, hash: ContentHash) -> Self {
        Self {
            name: name.into(),
            variant: None,
            extension: None,
            load_type,
            length,
            hash,
        }
    }

    /// Set the variant.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Set the extension override.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// `name` or `name.variant`.
    pub fn full_name(&self) -> String {
        match &self.variant {
            Some(v) => format!("{}.{}", self.name, v),
            None => self.name.clone(),
        }
    }

    /// The key for strings nested under this resource.
    pub fn string_key(&self) -> StringKey {
        StringKey::from_hash(self.hash)
    }

    /// Write name, variant, extension (V1+), load type, length and hash.
    pub(crate) fn write_head(&self, w: &mut Writer, salt: &StringKey) -> Result<(), CodecError> {
        w.write_string(Some(&self.name), salt)?;
        w.write_string(self.variant.as_deref(), salt)?;
        if w.version().has_extension() {
            w.write_string(self.extension.as_deref(), salt)?;
        } else if self.extension.is_some() {
            return Err(CodecError::InvalidList(format!(
                "resource {} has an extension override, which {} cannot store",
                self.full_name(),
                w.version()
            )));
        }
        w.write_load_type(self.load_type)?;
        w.write_int(self.length)?;
        w.write_hash(self.hash)
    }

    /// Inverse of [`write_head`](Self::write_head).
    pub(crate) fn read_head(r: &mut Reader<'_>, salt: &StringKey) -> Result<Self, CodecError> {
        let name = r.read_required_string("resource name", salt)?;
        let variant = r.read_string("resource variant", salt)?;
        let extension = if r.version().has_extension() {
            r.read_string("resource extension", salt)?
        } else {
            None
        };
        let load_type = r.read_load_type()?;
        let length = r.read_int("resource length")?;
        let hash = r.read_hash("resource hash")?;
        Ok(Self {
            name,
            variant,
            extension,
            load_type,
            length,
            hash,
        })
    }
}

/// A file system container and the resources stored in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntry {
    /// Container name.
    pub name: String,
    /// Indexes into the resource table.
    pub resource_indexes: Vec<u32>,
}

/// A named subset of resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupEntry {
    /// Group name.
    pub name: String,
    /// Indexes into the resource table.
    pub resource_indexes: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Shared table codecs
// ---------------------------------------------------------------------------

/// Fail if any index is outside `0..len`.
pub(crate) fn check_indexes(
    table: &'static str,
    indexes: &[u32],
    len: usize,
) -> Result<(), CodecError> {
    match indexes.iter().find(|i| **i as usize >= len) {
        Some(index) => Err(CodecError::IndexOutOfRange {
            table,
            index: *index,
            len,
        }),
        None => Ok(()),
    }
}

/// Write the file system table, or reject a non-empty one the version
/// cannot store.
pub(crate) fn write_file_systems(
    w: &mut Writer,
    salt: &StringKey,
    file_systems: &[FileSystemEntry],
) -> Result<(), CodecError> {
    if !w.version().has_file_systems() {
        if file_systems.is_empty() {
            return Ok(());
        }
        return Err(CodecError::InvalidList(format!(
            "{} cannot store {} file systems",
            w.version(),
            file_systems.len()
        )));
    }
    w.write_count("file system count", file_systems.len())?;
    for fs in file_systems {
        w.write_string(Some(&fs.name), salt)?;
        w.write_indexes("file system resource count", &fs.resource_indexes)?;
    }
    Ok(())
}

/// Read the file system table. Empty for versions without one.
pub(crate) fn read_file_systems(
    r: &mut Reader<'_>,
    salt: &StringKey,
) -> Result<Vec<FileSystemEntry>, CodecError> {
    if !r.version().has_file_systems() {
        return Ok(Vec::new());
    }
    let count = r.read_count("file system count")?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let name = r.read_required_string("file system name", salt)?;
        let resource_indexes = r.read_indexes("file system resource count")?;
        out.push(FileSystemEntry {
            name,
            resource_indexes,
        });
    }
    Ok(out)
}

/// Write the resource group table.
pub(crate) fn write_resource_groups(
    w: &mut Writer,
    salt: &StringKey,
    groups: &[ResourceGroupEntry],
) -> Result<(), CodecError> {
    w.write_count("resource group count", groups.len())?;
    for group in groups {
        w.write_string(Some(&group.name), salt)?;
        w.write_count("resource group size", group.resource_indexes.len())?;
        for index in &group.resource_indexes {
            w.write_group_index(*index)?;
        }
    }
    Ok(())
}

/// Read the resource group table.
pub(crate) fn read_resource_groups(
    r: &mut Reader<'_>,
    salt: &StringKey,
) -> Result<Vec<ResourceGroupEntry>, CodecError> {
    let count = r.read_count("resource group count")?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let name = r.read_required_string("resource group name", salt)?;
        let size = r.read_count("resource group size")?;
        let mut resource_indexes = Vec::with_capacity(size);
        for _ in 0..size {
            resource_indexes.push(r.read_group_index()?);
        }
        out.push(ResourceGroupEntry {
            name,
            resource_indexes,
        });
    }
    Ok(out)
}

/// Range-check file system and group indexes against the resource table.
pub(crate) fn check_resource_references(
    file_systems: &[FileSystemEntry],
    groups: &[ResourceGroupEntry],
    resource_count: usize,
) -> Result<(), CodecError> {
    for fs in file_systems {
        check_indexes("file system resource", &fs.resource_indexes, resource_count)?;
    }
    for group in groups {
        check_indexes("resource group", &group.resource_indexes, resource_count)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::FormatVersion;

    fn salt() -> StringKey {
        StringKey::new([5, 6, 7, 8])
    }

    fn entry() -> ResourceEntry {
        ResourceEntry::new("ui/main", LoadType::LoadFromMemory, 1024, ContentHash::from_u32(0xabcd_0123))
            .with_variant("hd")
    }

    #[test]
    fn full_name_includes_variant() {
        assert_eq!(entry().full_name(), "ui/main.hd");
        let plain = ResourceEntry::new("x", LoadType::LoadFromFile, 0, ContentHash::from_u32(0));
        assert_eq!(plain.full_name(), "x");
    }

    #[test]
    fn head_round_trips_in_every_version() {
        for version in FormatVersion::ALL {
            let mut w = Writer::new(version);
            entry().write_head(&mut w, &salt()).unwrap();
            let bytes = w.into_bytes();
            let mut r = Reader::new(&bytes, version);
            assert_eq!(ResourceEntry::read_head(&mut r, &salt()).unwrap(), entry());
            r.finish().unwrap();
        }
    }

    #[test]
    fn extension_rejected_in_v0() {
        let mut w = Writer::new(FormatVersion::V0);
        let err = entry()
            .with_extension("bytes")
            .write_head(&mut w, &salt())
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidList(_)));
    }

    #[test]
    fn empty_extension_survives_v1() {
        let e = entry().with_extension("");
        let mut w = Writer::new(FormatVersion::V1);
        e.write_head(&mut w, &salt()).unwrap();
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes, FormatVersion::V1);
        assert_eq!(ResourceEntry::read_head(&mut r, &salt()).unwrap().extension, Some(String::new()));
    }

    #[test]
    fn file_systems_rejected_before_v2() {
        let fs = vec![FileSystemEntry {
            name: "core".into(),
            resource_indexes: vec![0],
        }];
        let mut w = Writer::new(FormatVersion::V1);
        assert!(write_file_systems(&mut w, &salt(), &fs).is_err());
        let mut w = Writer::new(FormatVersion::V1);
        write_file_systems(&mut w, &salt(), &[]).unwrap();
        assert!(w.is_empty());
    }

    #[test]
    fn out_of_range_group_index_detected() {
        let groups = vec![ResourceGroupEntry {
            name: "dlc".into(),
            resource_indexes: vec![0, 3],
        }];
        let err = check_resource_references(&[], &groups, 2).unwrap_err();
        assert!(matches!(
            err,
            CodecError::IndexOutOfRange {
                table: "resource group",
                index: 3,
                len: 2
            }
        ));
    }
}
