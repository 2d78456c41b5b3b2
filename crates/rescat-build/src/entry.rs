//! # BuildResources Entry Point
//!
//! Loads the saved configuration, overlays the caller's values, runs the
//! orchestrator and saves the configuration back when the build succeeds.

use std::path::Path;

use crate::collaborators::{AssetCollector, BundleCompiler};
use crate::collection::YamlCatalogCollector;
use crate::compiler::ArchiveBundleCompiler;
use crate::config::{BuildConfig, BuildRequest};
use crate::error::BuildResult;
use crate::orchestrator::{BuildOrchestrator, BuildOutcome};
use crate::registry::Registries;

/// Host-provided collaborators. Unset ones fall back to the defaults.
#[derive(Default)]
pub struct BuildEnvironment {
    /// Helper registries resolved against the configured tags.
    pub registries: Registries,
    /// Bundle compiler; defaults to [`ArchiveBundleCompiler`] over the asset root.
    pub compiler: Option<Box<dyn BundleCompiler>>,
    /// Catalog collector; defaults to [`YamlCatalogCollector`] relative to
    /// the config file.
    pub collector: Option<Box<dyn AssetCollector>>,
}

impl BuildEnvironment {
    /// The default registries and collaborators.
    pub fn with_defaults() -> BuildResult<Self> {
        Ok(Self {
            registries: Registries::with_defaults()?,
            ..Self::default()
        })
    }
}

impl std::fmt::Debug for BuildEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildEnvironment")
            .field("registries", &self.registries)
            .field("compiler", &self.compiler.is_some())
            .field("collector", &self.collector.is_some())
            .finish()
    }
}

/// Build resources with the config at `config_path`.
///
/// Errors only when the build cannot be set up; a build that runs and
/// fails is reported through [`BuildOutcome::success`].
pub fn build_resources(
    config_path: &Path,
    request: &BuildRequest,
    env: BuildEnvironment,
) -> BuildResult<BuildOutcome> {
    let mut config = BuildConfig::load(config_path)?;
    config.apply(request);

    let compiler = env
        .compiler
        .unwrap_or_else(|| Box::new(ArchiveBundleCompiler::new(config.asset_root.clone())));
    let collector = env.collector.unwrap_or_else(|| {
        let base = config_path.parent().unwrap_or_else(|| Path::new(""));
        Box::new(YamlCatalogCollector::relative_to(base))
    });
    let outcome = BuildOrchestrator::from_registries(config.clone(), &env.registries, compiler)?
        .with_collector(collector)
        .run();

    if outcome.success {
        config.save(config_path)?;
        tracing::info!(path = %config_path.display(), "configuration saved");
    }
    Ok(outcome)
}
