//! # Local Lists
//!
//! The read-only list shipped inside the application. It describes only
//! the packed resources and carries no asset graph: the runtime opens the
//! files directly.
//!
//! Layout: salt, resource count, resource heads (extension from V1), and
//! in V2 the file system table.

use serde::{Deserialize, Serialize};

use crate::cipher::StringKey;
use crate::envelope::ListKind;
use crate::error::CodecError;
use crate::model::{
    check_resource_references, read_file_systems, write_file_systems, FileSystemEntry,
    ResourceEntry,
};
use crate::version::{FormatVersion, VersionListCodec};
use crate::wire::{Reader, Writer};

/// A Local version list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVersionList {
    /// Packed resources.
    pub resources: Vec<ResourceEntry>,
    /// File system table (V2 only).
    pub file_systems: Vec<FileSystemEntry>,
}

impl LocalVersionList {
    /// Create a list from resource entries.
    pub fn new(resources: Vec<ResourceEntry>) -> Self {
        Self {
            resources,
            file_systems: Vec::new(),
        }
    }
}

impl VersionListCodec for LocalVersionList {
    const KIND: ListKind = ListKind::Local;

    fn encode(&self, version: FormatVersion, salt: &StringKey) -> Result<Vec<u8>, CodecError> {
        version.check_resource_count(self.resources.len())?;
        check_resource_references(&self.file_systems, &[], self.resources.len())?;

        let mut w = Writer::new(version);
        w.write_key(salt);
        w.write_count("resource count", self.resources.len())?;
        for resource in &self.resources {
            resource.write_head(&mut w, salt)?;
        }
        write_file_systems(&mut w, salt, &self.file_systems)?;
        Ok(w.into_bytes())
    }

    fn decode(bytes: &[u8], version: FormatVersion) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes, version);
        let salt = r.read_key()?;
        let count = r.read_count("resource count")?;
        version.check_resource_count(count)?;
        let mut resources = Vec::with_capacity(count);
        for _ in 0..count {
            resources.push(ResourceEntry::read_head(&mut r, &salt)?);
        }
        let file_systems = read_file_systems(&mut r, &salt)?;
        r.finish()?;
        check_resource_references(&file_systems, &[], resources.len())?;
        Ok(Self {
            resources,
            file_systems,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescat_core::{ContentHash, LoadType};

    fn list() -> LocalVersionList {
        LocalVersionList::new(vec![
            ResourceEntry::new("core", LoadType::LoadFromFile, 10, ContentHash::from_u32(1)),
            ResourceEntry::new("audio", LoadType::LoadFromMemoryAndDecrypt, 20, ContentHash::from_u32(2))
                .with_variant(""),
        ])
    }

    #[test]
    fn round_trips_in_every_version() {
        let salt = StringKey::new([3, 1, 4, 1]);
        for version in FormatVersion::ALL {
            let bytes = list().encode(version, &salt).unwrap();
            assert_eq!(LocalVersionList::decode(&bytes, version).unwrap(), list());
        }
    }

    #[test]
    fn file_systems_only_in_v2() {
        let mut with_fs = list();
        with_fs.file_systems.push(FileSystemEntry {
            name: "boot".into(),
            resource_indexes: vec![1],
        });
        let salt = StringKey::new([0; 4]);
        assert!(with_fs.encode(FormatVersion::V1, &salt).is_err());
        let bytes = with_fs.encode(FormatVersion::V2, &salt).unwrap();
        assert_eq!(LocalVersionList::decode(&bytes, FormatVersion::V2).unwrap(), with_fs);
    }

    #[test]
    fn decode_with_wrong_version_fails() {
        let salt = StringKey::new([9; 4]);
        let bytes = list().encode(FormatVersion::V0, &salt).unwrap();
        assert!(LocalVersionList::decode(&bytes, FormatVersion::V1).is_err());
    }
}
