//! # Archive Bundle Compiler
//!
//! The default [`BundleCompiler`]: packs each bundle's member assets into
//! one container (same layout as a file system container) under the
//! working directory. Asset bytes come from the asset root; without one,
//! each member is stored as its name, which is enough to exercise the
//! pipeline end to end.

use std::path::{Path, PathBuf};

use rescat_core::Platform;

use crate::collaborators::{BundleCompiler, BundleDescriptor, BundleManifest, CompilerError};
use crate::filesystem::FileSystemWriter;

/// Bundle file extension inside the working directory.
pub const BUNDLE_EXTENSION: &str = "bundle";

/// Packs member assets into container files.
#[derive(Debug, Clone, Default)]
pub struct ArchiveBundleCompiler {
    asset_root: Option<PathBuf>,
}

impl ArchiveBundleCompiler {
    /// A compiler reading assets from `asset_root`, if given.
    pub fn new(asset_root: Option<PathBuf>) -> Self {
        Self { asset_root }
    }

    fn asset_bytes(&self, name: &str) -> Result<Vec<u8>, CompilerError> {
        match &self.asset_root {
            Some(root) => {
                let path = root.join(name);
                std::fs::read(&path).map_err(|e| {
                    CompilerError(format!("cannot read asset {}: {e}", path.display()))
                })
            }
            None => Ok(name.as_bytes().to_vec()),
        }
    }
}

impl BundleCompiler for ArchiveBundleCompiler {
    fn compile(
        &mut self,
        platform: Platform,
        bundles: &[BundleDescriptor],
        working_dir: &Path,
    ) -> Result<BundleManifest, CompilerError> {
        std::fs::create_dir_all(working_dir).map_err(|e| {
            CompilerError(format!("cannot create {}: {e}", working_dir.display()))
        })?;

        let mut manifest = BundleManifest::new();
        for bundle in bundles {
            let mut archive = FileSystemWriter::new();
            for name in &bundle.asset_names {
                archive.add(name.clone(), self.asset_bytes(name)?);
            }
            let bytes = archive
                .to_bytes()
                .map_err(|e| CompilerError(format!("bundle {}: {e}", bundle.key)))?;
            let path = working_dir.join(format!("{}.{BUNDLE_EXTENSION}", bundle.key.full_name()));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CompilerError(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
            std::fs::write(&path, bytes)
                .map_err(|e| CompilerError(format!("cannot write {}: {e}", path.display())))?;
            manifest.insert(bundle.key.clone(), path);
        }
        tracing::debug!(%platform, bundles = manifest.len(), "bundles compiled");
        Ok(manifest)
    }
}
