//! # Resource Catalog
//!
//! The in-memory catalog of resources and the assets they contain. A
//! catalog is built fresh for every build invocation: the collector adds
//! resources and assets, dependency analysis fills in the dependency
//! names, and each platform build records a [`PlatformCode`] per resource.
//!
//! ## Invariants
//!
//! - Resource keys (name + variant) are unique, and so are their full
//!   names: `ui.hd` and `ui` with variant `hd` cannot coexist, since both
//!   map to the same output file.
//! - Every asset name belongs to exactly one resource.
//! - Asset guids are unique.
//! - After [`Catalog::validate`], no resource is empty and every
//!   dependency name refers to an asset in the catalog.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::hash::ContentHash;
use crate::identity::{AssetGuid, ResourceKey};
use crate::load_type::LoadType;
use crate::platform::Platform;

/// An asset packed into a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable external identifier.
    pub guid: AssetGuid,
    /// Logical name, unique across the catalog.
    pub name: String,
    /// Source file length in bytes, when known.
    #[serde(default)]
    pub length: u64,
    /// Source file content hash, when known.
    #[serde(default)]
    pub hash: ContentHash,
    /// Names of assets this asset depends on, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Asset {
    /// Create an asset with no dependencies.
    pub fn new(guid: AssetGuid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
            length: 0,
            hash: ContentHash::default(),
            dependencies: Vec::new(),
        }
    }

    /// Set the dependency names.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

/// The outcome of building one resource for one platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCode {
    /// Length of the plaintext payload.
    pub length: u32,
    /// Hash of the plaintext payload.
    pub hash: ContentHash,
    /// Length of the payload as uploaded to the Full tree.
    pub compressed_length: u32,
    /// Hash of the payload as uploaded to the Full tree.
    pub compressed_hash: ContentHash,
}

/// A resource (bundle): a named, optionally varianted set of assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    key: ResourceKey,
    /// File extension override; `None` means the default extension.
    pub extension: Option<String>,
    /// How the runtime loads the payload.
    pub load_type: LoadType,
    /// Whether the resource ships inside the read-only local container.
    pub packed: bool,
    /// Containing file system, if any.
    pub file_system: Option<String>,
    /// Resource groups this resource belongs to.
    pub groups: BTreeSet<String>,
    assets: Vec<Asset>,
    codes: BTreeMap<Platform, PlatformCode>,
}

impl Resource {
    /// Create an empty resource with default attributes.
    pub fn new(key: ResourceKey) -> Self {
        Self {
            key,
            extension: None,
            load_type: LoadType::default(),
            packed: false,
            file_system: None,
            groups: BTreeSet::new(),
            assets: Vec::new(),
            codes: BTreeMap::new(),
        }
    }

    /// Set the load type.
    pub fn with_load_type(mut self, load_type: LoadType) -> Self {
        self.load_type = load_type;
        self
    }

    /// Mark the resource as packed into the local read-only container.
    pub fn with_packed(mut self, packed: bool) -> Self {
        self.packed = packed;
        self
    }

    /// Place the resource into a named file system.
    pub fn with_file_system(mut self, file_system: impl Into<String>) -> Self {
        self.file_system = Some(file_system.into());
        self
    }

    /// Add the resource to a resource group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Override the file extension. The extension may not be empty or
    /// contain `.` or `/`.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Result<Self, CatalogError> {
        let extension = extension.into();
        if extension.is_empty() || extension.contains(['.', '/', '\\']) {
            return Err(CatalogError::InvalidName {
                value: extension,
                reason: "extension must be a non-empty name without separators".into(),
            });
        }
        self.extension = Some(extension);
        Ok(self)
    }

    /// The resource key.
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// The assets in insertion order.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// The build outcome for a platform, if the platform has been built.
    pub fn code(&self, platform: Platform) -> Option<&PlatformCode> {
        self.codes.get(&platform)
    }

    /// Record the build outcome for a platform.
    pub fn set_code(&mut self, platform: Platform, code: PlatformCode) {
        self.codes.insert(platform, code);
    }
}

fn describe_key(key: &ResourceKey) -> String {
    match &key.variant {
        Some(variant) => format!("{} with variant {variant}", key.name),
        None => format!("{} without variant", key.name),
    }
}

/// The resource catalog for one build invocation.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    resources: BTreeMap<ResourceKey, Resource>,
    full_names: HashMap<String, ResourceKey>,
    asset_owners: HashMap<String, ResourceKey>,
    guid_owners: HashMap<AssetGuid, String>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. Any assets it already carries are registered too.
    ///
    /// Nothing is added unless every asset can be registered.
    pub fn add_resource(&mut self, mut resource: Resource) -> Result<(), CatalogError> {
        if self.resources.contains_key(&resource.key) {
            return Err(CatalogError::DuplicateResource(resource.key.to_string()));
        }
        let full_name = resource.key.full_name();
        if let Some(existing) = self.full_names.get(&full_name) {
            return Err(CatalogError::ConflictingResourceName {
                full_name,
                existing: describe_key(existing),
                added: describe_key(&resource.key),
            });
        }
        self.check_new_assets(&resource.assets)?;

        let assets = std::mem::take(&mut resource.assets);
        let key = resource.key.clone();
        self.full_names.insert(full_name, key.clone());
        self.resources.insert(key.clone(), resource);
        for asset in assets {
            self.add_asset(&key, asset)?;
        }
        Ok(())
    }

    /// Reject assets that collide with the catalog or with each other.
    fn check_new_assets(&self, assets: &[Asset]) -> Result<(), CatalogError> {
        let mut names: HashSet<&str> = HashSet::new();
        let mut guids: HashMap<AssetGuid, &str> = HashMap::new();
        for asset in assets {
            if let Some(owner) = self.asset_owners.get(&asset.name) {
                return Err(CatalogError::DuplicateAsset {
                    asset: asset.name.clone(),
                    owner: owner.to_string(),
                });
            }
            if !names.insert(&asset.name) {
                return Err(CatalogError::DuplicateAsset {
                    asset: asset.name.clone(),
                    owner: "the same resource".into(),
                });
            }
            if let Some(first) = self.guid_owners.get(&asset.guid) {
                return Err(CatalogError::DuplicateGuid {
                    guid: asset.guid.to_string(),
                    first: first.clone(),
                    second: asset.name.clone(),
                });
            }
            if let Some(first) = guids.insert(asset.guid, &asset.name) {
                return Err(CatalogError::DuplicateGuid {
                    guid: asset.guid.to_string(),
                    first: first.to_string(),
                    second: asset.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Add an asset to an existing resource.
    pub fn add_asset(&mut self, key: &ResourceKey, asset: Asset) -> Result<(), CatalogError> {
        if let Some(owner) = self.asset_owners.get(&asset.name) {
            return Err(CatalogError::DuplicateAsset {
                asset: asset.name,
                owner: owner.to_string(),
            });
        }
        if let Some(first) = self.guid_owners.get(&asset.guid) {
            return Err(CatalogError::DuplicateGuid {
                guid: asset.guid.to_string(),
                first: first.clone(),
                second: asset.name,
            });
        }
        let resource = self
            .resources
            .get_mut(key)
            .ok_or_else(|| CatalogError::ResourceNotFound(key.to_string()))?;
        self.asset_owners.insert(asset.name.clone(), key.clone());
        self.guid_owners.insert(asset.guid, asset.name.clone());
        resource.assets.push(asset);
        Ok(())
    }

    /// Replace the dependency names of an asset.
    pub fn set_dependencies(
        &mut self,
        asset_name: &str,
        dependencies: Vec<String>,
    ) -> Result<(), CatalogError> {
        let asset = self
            .asset_mut(asset_name)
            .ok_or_else(|| CatalogError::AssetNotFound(asset_name.to_string()))?;
        asset.dependencies = dependencies;
        Ok(())
    }

    /// Look up an asset by name.
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        let owner = self.asset_owners.get(name)?;
        self.resources
            .get(owner)?
            .assets
            .iter()
            .find(|a| a.name == name)
    }

    /// Look up an asset by name, mutably.
    pub fn asset_mut(&mut self, name: &str) -> Option<&mut Asset> {
        let owner = self.asset_owners.get(name)?;
        self.resources
            .get_mut(owner)?
            .assets
            .iter_mut()
            .find(|a| a.name == name)
    }

    /// The resource that owns an asset.
    pub fn asset_owner(&self, name: &str) -> Option<&ResourceKey> {
        self.asset_owners.get(name)
    }

    /// Whether an asset name is in the catalog.
    pub fn contains_asset(&self, name: &str) -> bool {
        self.asset_owners.contains_key(name)
    }

    /// Look up a resource by key.
    pub fn resource(&self, key: &ResourceKey) -> Option<&Resource> {
        self.resources.get(key)
    }

    /// Look up a resource by key, mutably.
    pub fn resource_mut(&mut self, key: &ResourceKey) -> Option<&mut Resource> {
        self.resources.get_mut(key)
    }

    /// Resources in key order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Resources in key order, mutably.
    pub fn resources_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.resources.values_mut()
    }

    /// All assets, grouped by resource in key order.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.resources.values().flat_map(|r| r.assets.iter())
    }

    /// Number of resources.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Number of assets.
    pub fn asset_count(&self) -> usize {
        self.asset_owners.len()
    }

    /// Group name -> member resource keys, both in sorted order.
    pub fn resource_groups(&self) -> BTreeMap<String, Vec<ResourceKey>> {
        let mut groups: BTreeMap<String, Vec<ResourceKey>> = BTreeMap::new();
        for resource in self.resources.values() {
            for group in &resource.groups {
                groups
                    .entry(group.clone())
                    .or_default()
                    .push(resource.key.clone());
            }
        }
        groups
    }

    /// File system name -> member resource keys, both in sorted order.
    pub fn file_systems(&self) -> BTreeMap<String, Vec<ResourceKey>> {
        let mut systems: BTreeMap<String, Vec<ResourceKey>> = BTreeMap::new();
        for resource in self.resources.values() {
            if let Some(fs) = &resource.file_system {
                systems.entry(fs.clone()).or_default().push(resource.key.clone());
            }
        }
        systems
    }

    /// Check the structural invariants that must hold before a build.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for resource in self.resources.values() {
            if resource.assets.is_empty() {
                return Err(CatalogError::EmptyResource(resource.key.to_string()));
            }
            if resource.load_type.is_binary() && resource.assets.len() != 1 {
                return Err(CatalogError::BinaryResourceAssetCount {
                    resource: resource.key.to_string(),
                    count: resource.assets.len(),
                });
            }
            for asset in &resource.assets {
                if let Some(missing) = asset
                    .dependencies
                    .iter()
                    .find(|d| !self.asset_owners.contains_key(d.as_str()))
                {
                    return Err(CatalogError::UnknownDependency {
                        asset: asset.name.clone(),
                        dependency: missing.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
