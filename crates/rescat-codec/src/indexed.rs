//! # Package and Updatable Lists
//!
//! The two full version list kinds share one layout and differ only in
//! whether each resource also carries the length and hash of its
//! compressed payload. [`IndexedVersionList`] is generic over that
//! difference through [`CompressionFields`].
//!
//! ## Layouts
//!
//! Every version starts with the 4-byte salt, the applicable version
//! string and the internal revision.
//!
//! - **V0** has no global asset table. Each resource record is followed by
//!   the names of its own assets and their dependency names, encrypted with
//!   the resource's hash key. The decoder rebuilds the sorted asset table
//!   with [`IndexResolver::resolve`], the same routine the encoder's caller
//!   uses, so indexes come out identical. Group member indexes are 2 bytes.
//! - **V1** writes the flat asset table first, then resources that refer
//!   into it by index, then groups.
//! - **V2** is V1 plus the file system table between resources and groups.

use std::fmt::Debug;

use rescat_core::ContentHash;
use serde::{Deserialize, Serialize};

use crate::cipher::StringKey;
use crate::envelope::ListKind;
use crate::error::CodecError;
use crate::model::{
    check_indexes, check_resource_references, read_file_systems, read_resource_groups,
    write_file_systems, write_resource_groups, Asset, FileSystemEntry, ResourceEntry,
    ResourceGroupEntry,
};
use crate::resolver::IndexResolver;
use crate::version::{FormatVersion, VersionListCodec};
use crate::wire::{Reader, Writer};

// ---------------------------------------------------------------------------
// Compression fields
// ---------------------------------------------------------------------------

/// The per-resource fields that distinguish Package from Updatable.
pub trait CompressionFields: Debug + Clone + PartialEq + Eq + Serialize {
    /// The list kind that carries these fields.
    const KIND: ListKind;

    /// Write the fields after the resource head.
    fn write(&self, w: &mut Writer) -> Result<(), CodecError>;

    /// Read the fields after the resource head.
    fn read(r: &mut Reader<'_>) -> Result<Self, CodecError>;
}

/// No compression fields (Package lists).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uncompressed;

impl CompressionFields for Uncompressed {
    const KIND: ListKind = ListKind::Package;

    fn write(&self, _w: &mut Writer) -> Result<(), CodecError> {
        Ok(())
    }

    fn read(_r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self)
    }
}

/// Compressed payload length and hash (Updatable lists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compressed {
    /// Compressed payload length.
    pub length: u32,
    /// Compressed payload hash.
    pub hash: ContentHash,
}

impl CompressionFields for Compressed {
    const KIND: ListKind = ListKind::Updatable;

    fn write(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.write_int(self.length)?;
        w.write_hash(self.hash)
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let length = r.read_int("compressed length")?;
        let hash = r.read_hash("compressed hash")?;
        Ok(Self { length, hash })
    }
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

/// A resource record with its asset references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedResource<C> {
    /// Name, variant, extension, load type, length and hash.
    #[serde(flatten)]
    pub entry: ResourceEntry,
    /// Kind-specific compression fields.
    pub compressed: C,
    /// Indexes of this resource's assets in the asset table.
    pub asset_indexes: Vec<u32>,
}

/// A Package or Updatable version list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedVersionList<C> {
    /// The application version the list applies to.
    pub applicable_version: String,
    /// Build revision within that version.
    pub internal_revision: u32,
    /// Asset table, strictly ascending by name.
    pub assets: Vec<Asset>,
    /// Resource table.
    pub resources: Vec<IndexedResource<C>>,
    /// File system table (V2 only).
    pub file_systems: Vec<FileSystemEntry>,
    /// Resource group table.
    pub resource_groups: Vec<ResourceGroupEntry>,
}

/// A resource in a Package list.
pub type PackageResource = IndexedResource<Uncompressed>;
/// A Package version list.
pub type PackageVersionList = IndexedVersionList<Uncompressed>;
/// A resource in an Updatable list.
pub type UpdatableResource = IndexedResource<Compressed>;
/// An Updatable version list.
pub type UpdatableVersionList = IndexedVersionList<Compressed>;

impl<C: CompressionFields> IndexedVersionList<C> {
    /// Create an empty list.
    pub fn new(applicable_version: impl Into<String>, internal_revision: u32) -> Self {
        Self {
            applicable_version: applicable_version.into(),
            internal_revision,
            assets: Vec::new(),
            resources: Vec::new(),
            file_systems: Vec::new(),
            resource_groups: Vec::new(),
        }
    }

    /// Check every structural invariant the given version relies on.
    pub fn validate(&self, version: FormatVersion) -> Result<(), CodecError> {
        if let Some(pair) = self.assets.windows(2).find(|w| w[0].name >= w[1].name) {
            return Err(CodecError::InvalidList(format!(
                "asset table is not strictly ascending at {:?}, {:?}",
                pair[0].name, pair[1].name
            )));
        }
        let asset_count = self.assets.len();
        for asset in &self.assets {
            check_indexes("asset dependency", &asset.dependency_asset_indexes, asset_count)?;
        }
        for resource in &self.resources {
            check_indexes("resource asset", &resource.asset_indexes, asset_count)?;
        }
        check_resource_references(&self.file_systems, &self.resource_groups, self.resources.len())?;

        match version {
            FormatVersion::V0 => self.check_single_ownership(),
            FormatVersion::V1 | FormatVersion::V2 => Ok(()),
        }
    }

    /// V0 stores assets under their resource, so each asset needs exactly
    /// one owner for the table to be rebuilt on decode.
    fn check_single_ownership(&self) -> Result<(), CodecError> {
        let mut seen = vec![false; self.assets.len()];
        for resource in &self.resources {
            for index in &resource.asset_indexes {
                let slot = &mut seen[*index as usize];
                if *slot {
                    return Err(CodecError::InvalidList(format!(
                        "asset {:?} is referenced by more than one resource",
                        self.assets[*index as usize].name
                    )));
                }
                *slot = true;
            }
        }
        match seen.iter().position(|s| !s) {
            Some(i) => Err(CodecError::InvalidList(format!(
                "asset {:?} belongs to no resource",
                self.assets[i].name
            ))),
            None => Ok(()),
        }
    }

    fn write_header(&self, w: &mut Writer, salt: &StringKey) -> Result<(), CodecError> {
        w.write_key(salt);
        w.write_string(Some(&self.applicable_version), salt)?;
        w.write_int(self.internal_revision)
    }

    fn encode_v0(&self, w: &mut Writer, salt: &StringKey) -> Result<(), CodecError> {
        w.write_count("resource count", self.resources.len())?;
        for resource in &self.resources {
            resource.entry.write_head(w, salt)?;
            resource.compressed.write(w)?;
            let key = resource.entry.string_key();
            w.write_count("resource asset count", resource.asset_indexes.len())?;
            for index in &resource.asset_indexes {
                let asset = &self.assets[*index as usize];
                w.write_string(Some(&asset.name), &key)?;
                w.write_count("dependency count", asset.dependency_asset_indexes.len())?;
                for dep in &asset.dependency_asset_indexes {
                    w.write_string(Some(&self.assets[*dep as usize].name), &key)?;
                }
            }
        }
        write_resource_groups(w, salt, &self.resource_groups)
    }

    fn encode_indexed(&self, w: &mut Writer, salt: &StringKey) -> Result<(), CodecError> {
        w.write_count("asset count", self.assets.len())?;
        for asset in &self.assets {
            w.write_string(Some(&asset.name), salt)?;
            w.write_indexes("dependency count", &asset.dependency_asset_indexes)?;
        }
        w.write_count("resource count", self.resources.len())?;
        for resource in &self.resources {
            resource.entry.write_head(w, salt)?;
            resource.compressed.write(w)?;
            w.write_indexes("resource asset count", &resource.asset_indexes)?;
        }
        write_file_systems(w, salt, &self.file_systems)?;
        write_resource_groups(w, salt, &self.resource_groups)
    }

    fn decode_v0(r: &mut Reader<'_>, salt: &StringKey) -> Result<DecodedTables<C>, CodecError> {
        let resource_count = r.read_count("resource count")?;
        FormatVersion::V0.check_resource_count(resource_count)?;

        let mut heads = Vec::with_capacity(resource_count);
        let mut pairs: Vec<(String, Vec<String>)> = Vec::new();
        let mut owned_names: Vec<Vec<String>> = Vec::with_capacity(resource_count);
        for _ in 0..resource_count {
            let entry = ResourceEntry::read_head(r, salt)?;
            let compressed = C::read(r)?;
            let key = entry.string_key();
            let asset_count = r.read_count("resource asset count")?;
            let mut names = Vec::with_capacity(asset_count);
            for _ in 0..asset_count {
                let name = r.read_required_string("asset name", &key)?;
                let dep_count = r.read_count("dependency count")?;
                let mut deps = Vec::with_capacity(dep_count);
                for _ in 0..dep_count {
                    deps.push(r.read_required_string("dependency name", &key)?);
                }
                names.push(name.clone());
                pairs.push((name, deps));
            }
            heads.push((entry, compressed));
            owned_names.push(names);
        }

        let resolved = IndexResolver::resolve(pairs)?;
        let mut resources = Vec::with_capacity(resource_count);
        for ((entry, compressed), names) in heads.into_iter().zip(owned_names) {
            let mut asset_indexes = Vec::with_capacity(names.len());
            for name in &names {
                // Every name was fed to the resolver above.
                let index = resolved.index_of(name).ok_or_else(|| {
                    CodecError::InvalidList(format!("asset {name:?} vanished during resolution"))
                })?;
                asset_indexes.push(index);
            }
            resources.push(IndexedResource {
                entry,
                compressed,
                asset_indexes,
            });
        }
        let resource_groups = read_resource_groups(r, salt)?;
        Ok(DecodedTables {
            assets: resolved.into_assets(),
            resources,
            file_systems: Vec::new(),
            resource_groups,
        })
    }

    fn decode_indexed(r: &mut Reader<'_>, salt: &StringKey) -> Result<DecodedTables<C>, CodecError> {
        let asset_count = r.read_count("asset count")?;
        let mut assets = Vec::with_capacity(asset_count);
        for _ in 0..asset_count {
            let name = r.read_required_string("asset name", salt)?;
            let dependency_asset_indexes = r.read_indexes("dependency count")?;
            assets.push(Asset {
                name,
                dependency_asset_indexes,
            });
        }
        let resource_count = r.read_count("resource count")?;
        let mut resources = Vec::with_capacity(resource_count);
        for _ in 0..resource_count {
            let entry = ResourceEntry::read_head(r, salt)?;
            let compressed = C::read(r)?;
            let asset_indexes = r.read_indexes("resource asset count")?;
            resources.push(IndexedResource {
                entry,
                compressed,
                asset_indexes,
            });
        }
        let file_systems = read_file_systems(r, salt)?;
        let resource_groups = read_resource_groups(r, salt)?;
        Ok(DecodedTables {
            assets,
            resources,
            file_systems,
            resource_groups,
        })
    }
}

struct DecodedTables<C> {
    assets: Vec<Asset>,
    resources: Vec<IndexedResource<C>>,
    file_systems: Vec<FileSystemEntry>,
    resource_groups: Vec<ResourceGroupEntry>,
}

impl<C: CompressionFields> VersionListCodec for IndexedVersionList<C> {
    const KIND: ListKind = C::KIND;

    fn encode(&self, version: FormatVersion, salt: &StringKey) -> Result<Vec<u8>, CodecError> {
        version.check_resource_count(self.resources.len())?;
        self.validate(version)?;

        let mut w = Writer::new(version);
        self.write_header(&mut w, salt)?;
        match version {
            FormatVersion::V0 => self.encode_v0(&mut w, salt)?,
            FormatVersion::V1 | FormatVersion::V2 => self.encode_indexed(&mut w, salt)?,
        }
        Ok(w.into_bytes())
    }

    fn decode(bytes: &[u8], version: FormatVersion) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes, version);
        let salt = r.read_key()?;
        let applicable_version = r.read_required_string("applicable version", &salt)?;
        let internal_revision = r.read_int("internal revision")?;
        let tables = match version {
            FormatVersion::V0 => Self::decode_v0(&mut r, &salt)?,
            FormatVersion::V1 | FormatVersion::V2 => Self::decode_indexed(&mut r, &salt)?,
        };
        r.finish()?;

        let list = Self {
            applicable_version,
            internal_revision,
            assets: tables.assets,
            resources: tables.resources,
            file_systems: tables.file_systems,
            resource_groups: tables.resource_groups,
        };
        list.validate(version)?;
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescat_core::LoadType;

    fn salt() -> StringKey {
        StringKey::new([0xaa, 0xbb, 0xcc, 0xdd])
    }

    fn entry(name: &str, hash: u32) -> ResourceEntry {
        ResourceEntry::new(name, LoadType::LoadFromFile, 100, ContentHash::from_u32(hash))
    }

    fn package() -> PackageVersionList {
        let mut list = PackageVersionList::new("1.2.0", 7);
        list.assets = vec![
            Asset::new("Assets/a.prefab", vec![1, 2]),
            Asset::new("Assets/b.mat", vec![2]),
            Asset::new("Assets/c.png", vec![]),
        ];
        list.resources = vec![
            PackageResource {
                entry: entry("ui", 0x1111_2222).with_variant("hd"),
                compressed: Uncompressed,
                asset_indexes: vec![0, 1],
            },
            PackageResource {
                entry: entry("textures", 0x3333_4444),
                compressed: Uncompressed,
                asset_indexes: vec![2],
            },
        ];
        list.resource_groups = vec![ResourceGroupEntry {
            name: "startup".into(),
            resource_indexes: vec![1, 0],
        }];
        list
    }

    #[test]
    fn package_round_trips_in_every_version() {
        for version in FormatVersion::ALL {
            let list = package();
            let bytes = list.encode(version, &salt()).unwrap();
            let decoded = PackageVersionList::decode(&bytes, version).unwrap();
            assert_eq!(decoded, list, "version {version}");
        }
    }

    #[test]
    fn updatable_round_trips_with_compression_fields() {
        let base = package();
        let list = UpdatableVersionList {
            applicable_version: base.applicable_version,
            internal_revision: base.internal_revision,
            assets: base.assets,
            resources: base
                .resources
                .into_iter()
                .enumerate()
                .map(|(i, r)| UpdatableResource {
                    entry: r.entry,
                    compressed: Compressed {
                        length: 40 + i as u32,
                        hash: ContentHash::from_u32(0xfeed_0000 + i as u32),
                    },
                    asset_indexes: r.asset_indexes,
                })
                .collect(),
            file_systems: vec![FileSystemEntry {
                name: "core".into(),
                resource_indexes: vec![0, 1],
            }],
            resource_groups: base.resource_groups,
        };
        let bytes = list.encode(FormatVersion::V2, &salt()).unwrap();
        assert_eq!(UpdatableVersionList::decode(&bytes, FormatVersion::V2).unwrap(), list);
    }

    #[test]
    fn v0_dependency_order_survives() {
        let mut list = package();
        list.assets[0].dependency_asset_indexes = vec![2, 1];
        let bytes = list.encode(FormatVersion::V0, &salt()).unwrap();
        let decoded = PackageVersionList::decode(&bytes, FormatVersion::V0).unwrap();
        assert_eq!(decoded.assets[0].dependency_asset_indexes, vec![2, 1]);
    }

    #[test]
    fn unsorted_assets_rejected() {
        let mut list = package();
        list.assets.swap(0, 2);
        let err = list.encode(FormatVersion::V1, &salt()).unwrap_err();
        assert!(matches!(err, CodecError::InvalidList(_)));
    }

    #[test]
    fn dangling_dependency_rejected() {
        let mut list = package();
        list.assets[2].dependency_asset_indexes = vec![3];
        let err = list.encode(FormatVersion::V2, &salt()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::IndexOutOfRange {
                table: "asset dependency",
                ..
            }
        ));
    }

    #[test]
    fn v0_rejects_shared_and_orphan_assets() {
        let mut shared = package();
        shared.resources[1].asset_indexes = vec![1, 2];
        assert!(shared.encode(FormatVersion::V0, &salt()).is_err());
        // V1 stores the flat table and does not care.
        assert!(shared.encode(FormatVersion::V1, &salt()).is_ok());

        let mut orphan = package();
        orphan.resources[1].asset_indexes.clear();
        assert!(orphan.encode(FormatVersion::V0, &salt()).is_err());
    }

    #[test]
    fn v0_duplicate_asset_names_across_resources_rejected() {
        // Hand-build a V0 body where two resources each claim "dup".
        let mut w = Writer::new(FormatVersion::V0);
        w.write_key(&salt());
        w.write_string(Some("1.0"), &salt()).unwrap();
        w.write_int(1).unwrap();
        w.write_count("resource count", 2).unwrap();
        for (name, hash) in [("r1", 1u32), ("r2", 2u32)] {
            let e = entry(name, hash);
            e.write_head(&mut w, &salt()).unwrap();
            w.write_count("assets", 1).unwrap();
            w.write_string(Some("dup"), &e.string_key()).unwrap();
            w.write_count("deps", 0).unwrap();
        }
        w.write_count("groups", 0).unwrap();
        let bytes = w.into_bytes();
        let err = PackageVersionList::decode(&bytes, FormatVersion::V0).unwrap_err();
        assert!(matches!(err, CodecError::Resolve(_)));
    }

    #[test]
    fn encoding_is_deterministic_for_a_fixed_salt() {
        let a = package().encode(FormatVersion::V1, &salt()).unwrap();
        let b = package().encode(FormatVersion::V1, &salt()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn truncated_input_fails_cleanly() {
        let bytes = package().encode(FormatVersion::V1, &salt()).unwrap();
        for cut in 0..bytes.len() {
            assert!(PackageVersionList::decode(&bytes[..cut], FormatVersion::V1).is_err());
        }
    }
}
