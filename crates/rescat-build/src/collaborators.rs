//! # External Collaborators
//!
//! The orchestrator drives, but never implements, these seams:
//!
//! - [`AssetCollector`] produces the catalog.
//! - [`DependencyAnalyzer`] fills in asset dependency names.
//! - [`BundleCompiler`] turns bundle descriptors into files. The
//!   orchestrator never looks inside a compiled bundle.
//! - [`BuildEventHandler`] receives hooks around the build and each
//!   platform, and decides whether a platform failure stops the build.
//! - [`CompressionHelper`] compresses payloads.
//!
//! All calls are synchronous and blocking.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rescat_core::{Catalog, Platform, ResourceKey};
use thiserror::Error;

use crate::config::BuildConfig;
use crate::error::BuildResult;
use crate::layout::OutputLayout;

// ---------------------------------------------------------------------------
// Catalog collaborators
// ---------------------------------------------------------------------------

/// Produces the catalog for one build invocation.
pub trait AssetCollector {
    /// Build a fresh catalog.
    fn collect(&mut self, config: &BuildConfig) -> BuildResult<Catalog>;
}

/// Fills in dependency names for the collected assets.
pub trait DependencyAnalyzer {
    /// Update dependencies in place.
    fn analyze(&mut self, catalog: &mut Catalog) -> BuildResult<()>;
}

/// Keeps the dependencies the collector declared, minus self-references
/// and repeats.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredDependencies;

impl DependencyAnalyzer for DeclaredDependencies {
    fn analyze(&mut self, catalog: &mut Catalog) -> BuildResult<()> {
        let names: Vec<String> = catalog.assets().map(|a| a.name.clone()).collect();
        for name in names {
            if let Some(asset) = catalog.asset_mut(&name) {
                let mut seen = HashSet::new();
                asset
                    .dependencies
                    .retain(|d| *d != name && seen.insert(d.clone()));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bundle compiler
// ---------------------------------------------------------------------------

/// One bundle the compiler must produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDescriptor {
    /// Bundle name and variant.
    pub key: ResourceKey,
    /// Member asset names, in catalog order.
    pub asset_names: Vec<String>,
}

/// What a successful compile produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleManifest {
    bundles: BTreeMap<ResourceKey, PathBuf>,
}

impl BundleManifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the output file of a bundle.
    pub fn insert(&mut self, key: ResourceKey, path: impl Into<PathBuf>) {
        self.bundles.insert(key, path.into());
    }

    /// The output file of a bundle.
    pub fn path(&self, key: &ResourceKey) -> Option<&Path> {
        self.bundles.get(key).map(PathBuf::as_path)
    }

    /// Number of bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether no bundle was produced.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

/// The compiler produced no manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CompilerError(pub String);

/// Compiles bundles for one platform.
pub trait BundleCompiler {
    /// Compile every descriptor into `working_dir`.
    fn compile(
        &mut self,
        platform: Platform,
        bundles: &[BundleDescriptor],
        working_dir: &Path,
    ) -> Result<BundleManifest, CompilerError>;
}

// ---------------------------------------------------------------------------
// Hooks and helpers
// ---------------------------------------------------------------------------

/// Everything a hook may want to know about the build.
#[derive(Debug, Clone, Copy)]
pub struct BuildParameters<'a> {
    /// The effective configuration.
    pub config: &'a BuildConfig,
    /// Output paths.
    pub layout: &'a OutputLayout,
}

/// Hooks around the whole build and around each platform.
pub trait BuildEventHandler {
    /// Whether a failed platform lets the remaining platforms build.
    fn continue_on_failure(&self) -> bool {
        false
    }

    /// Before the first platform.
    fn pre_process_build_all(&mut self, _params: &BuildParameters<'_>) {}

    /// After the last platform.
    fn post_process_build_all(&mut self, _params: &BuildParameters<'_>, _success: bool) {}

    /// Before one platform.
    fn pre_process_build(&mut self, _params: &BuildParameters<'_>, _platform: Platform) {}

    /// After one platform, successful or not.
    fn post_process_build(
        &mut self,
        _params: &BuildParameters<'_>,
        _platform: Platform,
        _success: bool,
    ) {
    }
}

/// Logs every hook through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventHandler {
    continue_on_failure: bool,
}

impl LogEventHandler {
    /// Create a handler with the given failure policy.
    pub fn new(continue_on_failure: bool) -> Self {
        Self {
            continue_on_failure,
        }
    }
}

impl BuildEventHandler for LogEventHandler {
    fn continue_on_failure(&self) -> bool {
        self.continue_on_failure
    }

    fn pre_process_build_all(&mut self, params: &BuildParameters<'_>) {
        tracing::info!(
            version = %params.config.applicable_version,
            revision = params.config.internal_revision,
            output = %params.layout.root().display(),
            "starting resource build"
        );
    }

    fn post_process_build_all(&mut self, params: &BuildParameters<'_>, success: bool) {
        tracing::info!(
            version = %params.config.applicable_version,
            success,
            "resource build finished"
        );
    }

    fn pre_process_build(&mut self, params: &BuildParameters<'_>, platform: Platform) {
        tracing::info!(
            %platform,
            working = %params.layout.working_dir(platform).display(),
            "building platform"
        );
    }

    fn post_process_build(&mut self, _params: &BuildParameters<'_>, platform: Platform, success: bool) {
        if success {
            tracing::info!(%platform, "platform built");
        } else {
            tracing::warn!(%platform, "platform failed");
        }
    }
}

/// Compresses payloads.
pub trait CompressionHelper {
    /// Tag the helper is registered under.
    fn name(&self) -> &str;

    /// Compress a payload.
    fn compress(&self, bytes: &[u8]) -> std::io::Result<Vec<u8>>;

    /// Invert [`compress`](Self::compress).
    fn decompress(&self, bytes: &[u8]) -> std::io::Result<Vec<u8>>;
}

/// Progress of one platform, reported before each bundle.
#[derive(Debug, Clone, Copy)]
pub struct BuildProgress<'a> {
    /// The platform being built.
    pub platform: Platform,
    /// The bundle about to be processed.
    pub resource: &'a ResourceKey,
    /// Zero-based position of the bundle.
    pub index: usize,
    /// Number of bundles on this platform.
    pub total: usize,
}

/// Progress callback. Returning `true` requests cancellation.
pub type ProgressCallback = dyn FnMut(BuildProgress<'_>) -> bool;
