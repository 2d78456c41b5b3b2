//! # YAML Catalog Collector
//!
//! The default [`AssetCollector`]: reads the catalog description named by
//! `catalog_file`.
//!
//! ```yaml
//! resources:
//!   - name: ui/main
//!     variant: hd
//!     load_type: load_from_memory_and_quick_decrypt
//!     packed: true
//!     file_system: boot
//!     groups: [base]
//!     assets:
//!       - name: Assets/Ui/Main.prefab
//!         dependencies: [Assets/Ui/Atlas.png]
//!       - name: Assets/Ui/Atlas.png
//!         guid: 6f1f4c0e-8a43-4a55-a8a8-3c4f5bb2b0f1
//! ```

use std::path::{Path, PathBuf};

use rescat_core::{Asset, AssetGuid, Catalog, LoadType, Resource, ResourceKey};
use serde::Deserialize;

use crate::collaborators::AssetCollector;
use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    resources: Vec<ResourceDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceDecl {
    name: String,
    #[serde(default)]
    variant: Option<String>,
    #[serde(default)]
    extension: Option<String>,
    #[serde(default)]
    load_type: LoadType,
    #[serde(default)]
    packed: bool,
    #[serde(default)]
    file_system: Option<String>,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    assets: Vec<AssetDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AssetDecl {
    name: String,
    #[serde(default)]
    guid: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Reads the catalog from YAML.
#[derive(Debug, Clone, Default)]
pub struct YamlCatalogCollector {
    base_dir: Option<PathBuf>,
}

impl YamlCatalogCollector {
    /// Resolve relative catalog paths against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative catalog paths against `dir`.
    pub fn relative_to(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn catalog_path(&self, config: &BuildConfig) -> PathBuf {
        match &self.base_dir {
            Some(base) if config.catalog_file.is_relative() => base.join(&config.catalog_file),
            _ => config.catalog_file.clone(),
        }
    }

    /// Parse catalog YAML.
    pub fn parse(path: &Path, content: &str) -> BuildResult<Catalog> {
        let file: CatalogFile = serde_yaml::from_str(content).map_err(|source| BuildError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

        let mut catalog = Catalog::new();
        for decl in file.resources {
            let key = ResourceKey::parse(&decl.name, decl.variant.as_deref())?;
            let mut resource = Resource::new(key.clone())
                .with_load_type(decl.load_type)
                .with_packed(decl.packed);
            if let Some(extension) = decl.extension {
                resource = resource.with_extension(extension)?;
            }
            if let Some(file_system) = decl.file_system {
                resource = resource.with_file_system(file_system);
            }
            for group in decl.groups {
                resource = resource.with_group(group);
            }
            catalog.add_resource(resource)?;

            for asset in decl.assets {
                let guid = match asset.guid {
                    Some(raw) => AssetGuid::new(raw)?,
                    None => AssetGuid::random(),
                };
                catalog.add_asset(
                    &key,
                    Asset::new(guid, asset.name).with_dependencies(asset.dependencies),
                )?;
            }
        }
        Ok(catalog)
    }
}

impl AssetCollector for YamlCatalogCollector {
    fn collect(&mut self, config: &BuildConfig) -> BuildResult<Catalog> {
        let path = self.catalog_path(config);
        let content = std::fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        let catalog = Self::parse(&path, &content)?;
        tracing::debug!(
            path = %path.display(),
            resources = catalog.resource_count(),
            assets = catalog.asset_count(),
            "catalog collected"
        );
        Ok(catalog)
    }
}
