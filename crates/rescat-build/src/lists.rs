//! # Version List Assembly
//!
//! Builds the three per-platform version lists from the catalog, the
//! resolved build map, and the platform codes recorded while processing
//! payloads.
//!
//! File system tables are only emitted when the configuration writes
//! containers; configuration validation already ties that to V2.

use rescat_codec::{
    Compressed, FileSystemEntry, IndexedResource, IndexedVersionList, LocalVersionList,
    PackageVersionList, ResourceEntry, ResourceGroupEntry, StringKey, Uncompressed,
    UpdatableVersionList, VersionListCodec,
};
use rescat_codec::{BuildMap, CompressionFields};
use rescat_core::{Catalog, Platform, PlatformCode, Resource, ResourceKey};

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};

/// The list record of a resource with one platform's code.
pub fn resource_entry(resource: &Resource, code: &PlatformCode) -> ResourceEntry {
    let key = resource.key();
    ResourceEntry {
        name: key.name.to_string(),
        variant: key.variant.as_ref().map(ToString::to_string),
        extension: resource.extension.clone(),
        load_type: resource.load_type,
        length: code.length,
        hash: code.hash,
    }
}

/// Assembles version lists for one build.
#[derive(Debug, Clone, Copy)]
pub struct ListAssembler<'a> {
    catalog: &'a Catalog,
    map: &'a BuildMap,
    config: &'a BuildConfig,
}

impl<'a> ListAssembler<'a> {
    /// Create an assembler.
    pub fn new(catalog: &'a Catalog, map: &'a BuildMap, config: &'a BuildConfig) -> Self {
        Self {
            catalog,
            map,
            config,
        }
    }

    fn resource(&self, key: &ResourceKey) -> BuildResult<&'a Resource> {
        self.catalog
            .resource(key)
            .ok_or_else(|| BuildError::Fatal(format!("resource {key} left the catalog")))
    }

    fn code(resource: &Resource, platform: Option<Platform>) -> BuildResult<PlatformCode> {
        match platform {
            None => Ok(PlatformCode::default()),
            Some(platform) => resource.code(platform).copied().ok_or_else(|| {
                BuildError::Fatal(format!(
                    "resource {} has no build output for {platform}",
                    resource.key()
                ))
            }),
        }
    }

    fn file_systems(&self, keys: &[ResourceKey]) -> Vec<FileSystemEntry> {
        if !self.config.use_file_systems {
            return Vec::new();
        }
        self.catalog
            .file_systems()
            .into_iter()
            .filter_map(|(name, members)| {
                let resource_indexes: Vec<u32> = members
                    .iter()
                    .filter_map(|m| keys.binary_search(m).ok().map(|i| i as u32))
                    .collect();
                (!resource_indexes.is_empty()).then_some(FileSystemEntry {
                    name,
                    resource_indexes,
                })
            })
            .collect()
    }

    fn resource_groups(&self) -> Vec<ResourceGroupEntry> {
        self.catalog
            .resource_groups()
            .into_iter()
            .map(|(name, members)| ResourceGroupEntry {
                name,
                resource_indexes: members
                    .iter()
                    .filter_map(|m| self.map.resource_index(m))
                    .collect(),
            })
            .collect()
    }

    fn indexed<C: CompressionFields>(
        &self,
        platform: Option<Platform>,
        fields: impl Fn(&PlatformCode) -> C,
    ) -> BuildResult<IndexedVersionList<C>> {
        let mut list = IndexedVersionList::new(
            self.config.applicable_version.clone(),
            self.config.internal_revision,
        );
        list.assets = self.map.assets.clone();
        for (key, asset_indexes) in self.map.resources.iter().zip(&self.map.resource_asset_indexes) {
            let resource = self.resource(key)?;
            let code = Self::code(resource, platform)?;
            list.resources.push(IndexedResource {
                entry: resource_entry(resource, &code),
                compressed: fields(&code),
                asset_indexes: asset_indexes.clone(),
            });
        }
        list.file_systems = self.file_system_table();
        list.resource_groups = self.resource_groups();
        Ok(list)
    }

    /// File system table indexed by build map position.
    pub fn file_system_table(&self) -> Vec<FileSystemEntry> {
        self.file_systems(&self.map.resources)
    }

    /// The Package list: every resource.
    pub fn package(&self, platform: Platform) -> BuildResult<PackageVersionList> {
        self.indexed(Some(platform), |_| Uncompressed)
    }

    /// The Updatable list: every resource with compressed fields.
    pub fn updatable(&self, platform: Platform) -> BuildResult<UpdatableVersionList> {
        self.indexed(Some(platform), |code| Compressed {
            length: code.compressed_length,
            hash: code.compressed_hash,
        })
    }

    /// The Local list: packed resources only.
    pub fn local(&self, platform: Platform) -> BuildResult<LocalVersionList> {
        let packed: Vec<ResourceKey> = self
            .catalog
            .resources()
            .filter(|r| r.packed)
            .map(|r| r.key().clone())
            .collect();
        let mut resources = Vec::with_capacity(packed.len());
        for key in &packed {
            let resource = self.resource(key)?;
            resources.push(resource_entry(resource, &Self::code(resource, Some(platform))?));
        }
        Ok(LocalVersionList {
            resources,
            file_systems: self.file_systems(&packed),
        })
    }

    /// Encode a Package list with placeholder codes, so capacity and
    /// layout problems surface before any output is written.
    pub fn preflight(&self) -> BuildResult<()> {
        let list: PackageVersionList = self.indexed(None, |_| Uncompressed)?;
        list.encode(self.config.format_version, &StringKey::new([0; 4]))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescat_codec::{FormatVersion, IndexResolver};
    use rescat_core::{Asset, AssetGuid, ContentHash};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        for (name, packed, fs, asset) in [
            ("core", true, Some("boot"), "Assets/Core.asset"),
            ("dlc", false, None, "Assets/Dlc.asset"),
            ("ui", true, Some("boot"), "Assets/Ui.prefab"),
        ] {
            let key = ResourceKey::parse(name, None).unwrap();
            let mut resource = Resource::new(key.clone())
                .with_packed(packed)
                .with_group("all");
            if let Some(fs) = fs {
                resource = resource.with_file_system(fs);
            }
            catalog.add_resource(resource).unwrap();
            catalog
                .add_asset(&key, Asset::new(AssetGuid::random(), asset))
                .unwrap();
        }
        let platform_codes: Vec<ResourceKey> = catalog.resources().map(|r| r.key().clone()).collect();
        for (i, key) in platform_codes.iter().enumerate() {
            catalog.resource_mut(key).unwrap().set_code(
                Platform::Android,
                PlatformCode {
                    length: 10 + i as u32,
                    hash: ContentHash::from_u32(i as u32 + 1),
                    compressed_length: 5 + i as u32,
                    compressed_hash: ContentHash::from_u32(100 + i as u32),
                },
            );
        }
        catalog
    }

    fn config(use_file_systems: bool) -> BuildConfig {
        BuildConfig {
            use_file_systems,
            ..BuildConfig::default()
        }
    }

    #[test]
    fn package_covers_every_resource() {
        let catalog = catalog();
        let map = IndexResolver::resolve_catalog(&catalog).unwrap();
        let config = config(false);
        let list = ListAssembler::new(&catalog, &map, &config)
            .package(Platform::Android)
            .unwrap();
        assert_eq!(list.resources.len(), 3);
        assert_eq!(list.resources[1].entry.name, "dlc");
        assert_eq!(list.resources[1].entry.length, 11);
        assert!(list.file_systems.is_empty());
        assert_eq!(list.resource_groups[0].resource_indexes, vec![0, 1, 2]);
    }

    #[test]
    fn updatable_carries_compressed_fields() {
        let catalog = catalog();
        let map = IndexResolver::resolve_catalog(&catalog).unwrap();
        let config = config(true);
        let list = ListAssembler::new(&catalog, &map, &config)
            .updatable(Platform::Android)
            .unwrap();
        assert_eq!(list.resources[2].compressed.length, 7);
        assert_eq!(list.resources[2].compressed.hash, ContentHash::from_u32(102));
        assert_eq!(list.file_systems.len(), 1);
        assert_eq!(list.file_systems[0].resource_indexes, vec![0, 2]);
    }

    #[test]
    fn local_covers_packed_subset_with_reindexed_file_systems() {
        let catalog = catalog();
        let map = IndexResolver::resolve_catalog(&catalog).unwrap();
        let config = config(true);
        let list = ListAssembler::new(&catalog, &map, &config)
            .local(Platform::Android)
            .unwrap();
        let names: Vec<&str> = list.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["core", "ui"]);
        assert_eq!(list.file_systems[0].resource_indexes, vec![0, 1]);
    }

    #[test]
    fn missing_platform_code_is_fatal() {
        let catalog = catalog();
        let map = IndexResolver::resolve_catalog(&catalog).unwrap();
        let config = config(false);
        let err = ListAssembler::new(&catalog, &map, &config)
            .package(Platform::Ios)
            .unwrap_err();
        assert!(matches!(err, BuildError::Fatal(_)));
    }

    #[test]
    fn preflight_catches_v0_extension_override() {
        let mut catalog = catalog();
        let key = ResourceKey::parse("ui", None).unwrap();
        catalog.resource_mut(&key).unwrap().extension = Some("bundle".into());
        let map = IndexResolver::resolve_catalog(&catalog).unwrap();
        let config = BuildConfig {
            format_version: FormatVersion::V0,
            ..BuildConfig::default()
        };
        let assembler = ListAssembler::new(&catalog, &map, &config);
        assert!(assembler.preflight().is_err());

        let v1 = BuildConfig {
            format_version: FormatVersion::V1,
            ..BuildConfig::default()
        };
        assert!(ListAssembler::new(&catalog, &map, &v1).preflight().is_ok());
    }
}
