//! # Build Orchestrator
//!
//! Drives one build invocation through a fixed sequence of stages:
//!
//! ```text
//! Idle ─▶ CollectingCatalog ─▶ AnalyzingDependencies ─▶ PreparingBuildMap
//!                                                             │
//!                                    ┌────────────────────────┘
//!                                    ▼
//!                      BuildingPlatform(p)* ─▶ WritingReport ─▶ Done | Failed
//! ```
//!
//! Any stage may jump straight to `WritingReport` on error; the report is
//! flushed whatever happened. An invalid configuration fails from `Idle`
//! without touching the file system.
//!
//! Platforms build one after another in fixed platform order. A failed or
//! cancelled platform stops the rest unless the event handler asks to
//! continue. Capacity and other fatal errors always stop the build.

use std::path::{Path, PathBuf};

use rescat_codec::envelope;
use rescat_codec::{BuildMap, IndexResolver};
use rescat_core::{Catalog, CatalogError, ContentHash, Platform, ResourceKey};

use crate::collaborators::{
    AssetCollector, BuildEventHandler, BuildParameters, BuildProgress, BundleCompiler,
    BundleDescriptor, BundleManifest, CompressionHelper, DeclaredDependencies,
    DependencyAnalyzer,
};
use crate::collection::YamlCatalogCollector;
use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::layout::{updatable_version_file, OutputLayout, LOCAL_VERSION_FILE, PACKAGE_VERSION_FILE};
use crate::lists::ListAssembler;
use crate::outputs::{write_file, PlatformOutputs};
use crate::payload::process_payload;
use crate::registry::Registries;
use crate::report::{write_report, BuildLog, BuildReport, UpdatableListInfo};

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Where a build invocation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStage {
    /// Not started.
    Idle,
    /// Asking the collector for the catalog.
    CollectingCatalog,
    /// Filling in dependencies and checking the catalog.
    AnalyzingDependencies,
    /// Resolving indexes and checking format capacity.
    PreparingBuildMap,
    /// Building one platform.
    BuildingPlatform(Platform),
    /// Flushing the report and log.
    WritingReport,
    /// Finished successfully (terminal).
    Done,
    /// Finished with an error (terminal).
    Failed,
}

impl BuildStage {
    /// Whether no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` may follow this stage.
    pub fn can_advance_to(&self, next: BuildStage) -> bool {
        use BuildStage::*;
        match (self, next) {
            (Idle, CollectingCatalog | Failed) => true,
            (CollectingCatalog, AnalyzingDependencies | WritingReport) => true,
            (AnalyzingDependencies, PreparingBuildMap | WritingReport) => true,
            (PreparingBuildMap, BuildingPlatform(_) | WritingReport) => true,
            (BuildingPlatform(_), BuildingPlatform(_) | WritingReport) => true,
            (WritingReport, Done | Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::CollectingCatalog => f.write_str("CollectingCatalog"),
            Self::AnalyzingDependencies => f.write_str("AnalyzingDependencies"),
            Self::PreparingBuildMap => f.write_str("PreparingBuildMap"),
            Self::BuildingPlatform(p) => write!(f, "BuildingPlatform({p})"),
            Self::WritingReport => f.write_str("WritingReport"),
            Self::Done => f.write_str("Done"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformOutcome {
    /// The platform.
    pub platform: Platform,
    /// Whether every output was written.
    pub success: bool,
    /// Resources processed.
    pub resources: usize,
}

/// Result of a build invocation.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Whether the build succeeded.
    pub success: bool,
    /// Terminal stage.
    pub stage: BuildStage,
    /// Platforms attempted, in order.
    pub platforms: Vec<PlatformOutcome>,
    /// The first error, if any.
    pub error: Option<BuildError>,
    /// `BuildReport.xml`, when it could be written.
    pub report_path: Option<PathBuf>,
    /// Everything logged during the build.
    pub log: BuildLog,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

type Progress = Box<dyn FnMut(BuildProgress<'_>) -> bool>;
type ErrorCallback = Box<dyn FnMut(&BuildError)>;

/// Runs one build.
pub struct BuildOrchestrator {
    config: BuildConfig,
    collector: Box<dyn AssetCollector>,
    analyzer: Box<dyn DependencyAnalyzer>,
    compiler: Box<dyn BundleCompiler>,
    event_handler: Option<Box<dyn BuildEventHandler>>,
    compression: Option<Box<dyn CompressionHelper>>,
    progress: Option<Progress>,
    on_error: Option<ErrorCallback>,
    stage: BuildStage,
    log: BuildLog,
}

impl std::fmt::Debug for BuildOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("config", &self.config)
            .field("stage", &self.stage)
            .field("event_handler", &self.event_handler.is_some())
            .field("compression", &self.compression.as_ref().map(|c| c.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl BuildOrchestrator {
    /// An orchestrator with the YAML collector, declared dependencies and
    /// no helpers.
    pub fn new(config: BuildConfig, compiler: Box<dyn BundleCompiler>) -> Self {
        Self {
            config,
            collector: Box::new(YamlCatalogCollector::new()),
            analyzer: Box::new(DeclaredDependencies),
            compiler,
            event_handler: None,
            compression: None,
            progress: None,
            on_error: None,
            stage: BuildStage::Idle,
            log: BuildLog::new(),
        }
    }

    /// Resolve the configured helper tags against `registries`.
    pub fn from_registries(
        config: BuildConfig,
        registries: &Registries,
        compiler: Box<dyn BundleCompiler>,
    ) -> BuildResult<Self> {
        let event_handler = registries.event_handlers.create(&config.event_handler)?;
        let compression = if config.additional_compression {
            if config.compression.is_none() {
                return Err(BuildError::Configuration(
                    "additional compression is enabled but no compression helper is set".into(),
                ));
            }
            registries.compression.create(&config.compression)?
        } else {
            None
        };
        let mut orchestrator = Self::new(config, compiler);
        orchestrator.event_handler = event_handler;
        orchestrator.compression = compression;
        Ok(orchestrator)
    }

    /// Replace the catalog collector.
    pub fn with_collector(mut self, collector: Box<dyn AssetCollector>) -> Self {
        self.collector = collector;
        self
    }

    /// Replace the dependency analyzer.
    pub fn with_analyzer(mut self, analyzer: Box<dyn DependencyAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Set the build event handler.
    pub fn with_event_handler(mut self, handler: Box<dyn BuildEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Set the compression helper.
    pub fn with_compression(mut self, helper: Box<dyn CompressionHelper>) -> Self {
        self.compression = Some(helper);
        self
    }

    /// Called before each bundle; returning `true` cancels the platform.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(BuildProgress<'_>) -> bool + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Called with the error that ends a failed build.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&BuildError) + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// The effective configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// The current stage.
    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// The compression helper must be present exactly when additional
    /// compression is enabled.
    fn check_helpers(&self) -> BuildResult<()> {
        match (&self.compression, self.config.additional_compression) {
            (None, true) => Err(BuildError::Configuration(
                "additional compression is enabled but no compression helper is set".into(),
            )),
            (Some(helper), false) => Err(BuildError::Configuration(format!(
                "compression helper {} is set but additional compression is disabled",
                helper.name()
            ))),
            _ => Ok(()),
        }
    }

    fn enter(&mut self, next: BuildStage) -> BuildResult<()> {
        if !self.stage.can_advance_to(next) {
            return Err(BuildError::Fatal(format!(
                "invalid stage transition {} -> {next}",
                self.stage
            )));
        }
        tracing::debug!(from = %self.stage, to = %next, "build stage");
        self.stage = next;
        Ok(())
    }

    fn fail(&mut self, error: &BuildError) {
        self.log.error(format!("{}: {error}", error.kind()));
        if let Some(callback) = self.on_error.as_mut() {
            callback(error);
        }
    }

    /// Run the build to completion.
    pub fn run(mut self) -> BuildOutcome {
        if let Err(error) = self.config.validate().and_then(|()| self.check_helpers()) {
            self.fail(&error);
            self.stage = BuildStage::Failed;
            return BuildOutcome {
                success: false,
                stage: self.stage,
                platforms: Vec::new(),
                error: Some(error),
                report_path: None,
                log: self.log,
            };
        }

        let layout = OutputLayout::new(
            &self.config.output_dir,
            &self.config.applicable_version,
            self.config.internal_revision,
        );
        let mut report = BuildReport::new(
            &self.config,
            self.compression.as_deref().map(|helper| helper.name()),
        );
        let mut platforms = Vec::new();
        self.log.info(format!(
            "building {} revision {} as {} into {}",
            self.config.applicable_version,
            self.config.internal_revision,
            self.config.format_version,
            layout.root().display()
        ));

        let mut error = self.execute(&layout, &mut report, &mut platforms).err();
        self.log.set_platform(None);
        if let Some(e) = &error {
            report.set_error(e);
            self.fail(e);
        }

        if let Err(e) = self.enter(BuildStage::WritingReport) {
            error.get_or_insert(e);
        }
        let success = error.is_none();
        self.log.info(if success {
            "build succeeded".to_string()
        } else {
            "build failed".to_string()
        });
        report.finish(success, &self.log);
        let report_path = match write_report(&layout, &report, &self.log) {
            Ok(path) => Some(path),
            Err(e) => {
                self.fail(&e);
                error.get_or_insert(e);
                None
            }
        };

        let success = error.is_none();
        self.stage = if success {
            BuildStage::Done
        } else {
            BuildStage::Failed
        };
        BuildOutcome {
            success,
            stage: self.stage,
            platforms,
            error,
            report_path,
            log: self.log,
        }
    }

    fn execute(
        &mut self,
        layout: &OutputLayout,
        report: &mut BuildReport,
        platforms: &mut Vec<PlatformOutcome>,
    ) -> BuildResult<()> {
        self.enter(BuildStage::CollectingCatalog)?;
        let mut catalog = self.collector.collect(&self.config)?;
        self.log.info(format!(
            "collected {} resources with {} assets",
            catalog.resource_count(),
            catalog.asset_count()
        ));

        self.enter(BuildStage::AnalyzingDependencies)?;
        self.analyzer.analyze(&mut catalog)?;
        catalog.validate()?;
        self.check_asset_files(&mut catalog)?;

        self.enter(BuildStage::PreparingBuildMap)?;
        let map = IndexResolver::resolve_catalog(&catalog)?;
        ListAssembler::new(&catalog, &map, &self.config).preflight()?;
        self.log.info(format!(
            "build map: {} assets, {} resources",
            map.assets.len(),
            map.resources.len()
        ));

        if let Some(handler) = self.event_handler.as_mut() {
            handler.pre_process_build_all(&BuildParameters {
                config: &self.config,
                layout,
            });
        }
        let result = self.build_platforms(&mut catalog, &map, layout, report, platforms);
        if let Some(handler) = self.event_handler.as_mut() {
            handler.post_process_build_all(
                &BuildParameters {
                    config: &self.config,
                    layout,
                },
                result.is_ok(),
            );
        }
        result
    }

    fn build_platforms(
        &mut self,
        catalog: &mut Catalog,
        map: &BuildMap,
        layout: &OutputLayout,
        report: &mut BuildReport,
        platforms: &mut Vec<PlatformOutcome>,
    ) -> BuildResult<()> {
        let continue_on_failure = self
            .event_handler
            .as_ref()
            .is_some_and(|h| h.continue_on_failure());
        let mut first_failure = None;

        for platform in self.config.build_order() {
            self.enter(BuildStage::BuildingPlatform(platform))?;
            self.log.set_platform(Some(platform));
            self.log.info(format!("building {} resources", map.resources.len()));
            report.begin_platform(platform, map.resources.len());
            if let Some(handler) = self.event_handler.as_mut() {
                handler.pre_process_build(
                    &BuildParameters {
                        config: &self.config,
                        layout,
                    },
                    platform,
                );
            }

            let result = self.build_platform(platform, catalog, map, layout, report);
            let success = result.is_ok();
            if let Some(handler) = self.event_handler.as_mut() {
                handler.post_process_build(
                    &BuildParameters {
                        config: &self.config,
                        layout,
                    },
                    platform,
                    success,
                );
            }
            report.end_platform(platform, success);
            let working = layout.working_dir(platform);
            if working.exists() {
                if let Err(e) = std::fs::remove_dir_all(&working) {
                    self.log
                        .warn(format!("cannot remove {}: {e}", working.display()));
                }
            }
            platforms.push(PlatformOutcome {
                platform,
                success,
                resources: if success { map.resources.len() } else { 0 },
            });

            match result {
                Ok(()) => self.log.info("platform built"),
                Err(e) => {
                    self.log.error(e.to_string());
                    if !(e.is_platform_failure() && continue_on_failure) {
                        return Err(e);
                    }
                    self.log.warn("continuing with the next platform");
                    first_failure.get_or_insert(e);
                }
            }
        }
        first_failure.map_or(Ok(()), Err)
    }

    fn build_platform(
        &mut self,
        platform: Platform,
        catalog: &mut Catalog,
        map: &BuildMap,
        layout: &OutputLayout,
        report: &mut BuildReport,
    ) -> BuildResult<()> {
        let working = layout.working_dir(platform);
        if self.config.force_rebuild && working.exists() {
            std::fs::remove_dir_all(&working).map_err(|e| BuildError::io(&working, e))?;
        }

        let descriptors: Vec<BundleDescriptor> = catalog
            .resources()
            .filter(|r| !r.load_type.is_binary())
            .map(|r| BundleDescriptor {
                key: r.key().clone(),
                asset_names: r.assets().iter().map(|a| a.name.clone()).collect(),
            })
            .collect();
        let manifest = if descriptors.is_empty() {
            BundleManifest::new()
        } else {
            self.compiler
                .compile(platform, &descriptors, &working)
                .map_err(|e| BuildError::Platform {
                    platform,
                    reason: format!("bundle compiler failed: {e}"),
                })?
        };
        self.log.info(format!("compiled {} bundles", manifest.len()));

        let mut outputs = PlatformOutputs::new(&self.config, layout, platform);
        let total = map.resources.len();
        for (index, key) in map.resources.iter().enumerate() {
            if let Some(progress) = self.progress.as_mut() {
                let cancel = progress(BuildProgress {
                    platform,
                    resource: key,
                    index,
                    total,
                });
                if cancel {
                    self.log.warn(format!("cancelled before {key}"));
                    return Err(BuildError::Cancelled { platform });
                }
            }

            let resource = catalog
                .resource(key)
                .ok_or_else(|| BuildError::Fatal(format!("resource {key} left the catalog")))?;
            let plain = self.read_payload(platform, resource.key(), &manifest, catalog)?;
            let payload = process_payload(plain, resource.load_type, self.compression.as_deref())?;
            outputs.add(resource, &payload)?;
            catalog
                .resource_mut(key)
                .ok_or_else(|| BuildError::Fatal(format!("resource {key} left the catalog")))?
                .set_code(platform, payload.code);
        }

        let assembler = ListAssembler::new(catalog, map, &self.config);
        outputs.finish(assembler.file_system_table())?;
        write_lists(
            &self.config,
            self.compression.as_deref(),
            &mut self.log,
            platform,
            &assembler,
            layout,
            report,
        )
    }

    fn read_payload(
        &self,
        platform: Platform,
        key: &ResourceKey,
        manifest: &BundleManifest,
        catalog: &Catalog,
    ) -> BuildResult<Vec<u8>> {
        let resource = catalog
            .resource(key)
            .ok_or_else(|| BuildError::Fatal(format!("resource {key} left the catalog")))?;
        let path = if resource.load_type.is_binary() {
            let root = self.config.asset_root.as_deref().ok_or_else(|| {
                BuildError::Configuration(format!(
                    "binary resource {key} needs an asset root to read from"
                ))
            })?;
            let asset = resource
                .assets()
                .first()
                .ok_or_else(|| CatalogError::EmptyResource(key.to_string()))?;
            root.join(&asset.name)
        } else {
            manifest
                .path(key)
                .ok_or_else(|| BuildError::Platform {
                    platform,
                    reason: format!("bundle compiler produced no output for {key}"),
                })?
                .to_path_buf()
        };
        std::fs::read(&path).map_err(|e| BuildError::io(path, e))
    }

    /// With an asset root configured, every asset must exist on disk; its
    /// length and hash are recorded in the catalog.
    fn check_asset_files(&mut self, catalog: &mut Catalog) -> BuildResult<()> {
        let Some(root) = self.config.asset_root.clone() else {
            return Ok(());
        };
        let names: Vec<String> = catalog.assets().map(|a| a.name.clone()).collect();
        for name in names {
            let path = root.join(&name);
            let bytes = read_asset(&path).ok_or_else(|| CatalogError::AssetFileMissing {
                asset: name.clone(),
                path: path.display().to_string(),
            })?;
            if let Some(asset) = catalog.asset_mut(&name) {
                asset.length = bytes.len() as u64;
                asset.hash = ContentHash::of(&bytes);
            }
        }
        self.log
            .info(format!("verified {} asset files", catalog.asset_count()));
        Ok(())
    }
}

fn write_lists(
    config: &BuildConfig,
    compression: Option<&dyn CompressionHelper>,
    log: &mut BuildLog,
    platform: Platform,
    assembler: &ListAssembler<'_>,
    layout: &OutputLayout,
    report: &mut BuildReport,
) -> BuildResult<()> {
    let version = config.format_version;
    if config.output_package {
        let bytes = envelope::write(&assembler.package(platform)?, version)?;
        write_file(&layout.package_dir(platform).join(PACKAGE_VERSION_FILE), &bytes)?;
    }
    if config.output_full {
        let plain = envelope::write(&assembler.updatable(platform)?, version)?;
        let stored = match compression {
            Some(helper) => helper.compress(&plain).map_err(|e| BuildError::Compression {
                helper: helper.name().to_string(),
                reason: e.to_string(),
            })?,
            None => plain.clone(),
        };
        let name = updatable_version_file(ContentHash::of(&plain));
        write_file(&layout.full_dir(platform).join(&name), &stored)?;
        report.set_updatable(platform, UpdatableListInfo::new(&plain, &stored));
        log.info(format!("wrote {name} ({} bytes)", stored.len()));
    }
    if config.output_packed {
        let bytes = envelope::write(&assembler.local(platform)?, version)?;
        write_file(&layout.packed_dir(platform).join(LOCAL_VERSION_FILE), &bytes)?;
    }
    Ok(())
}

fn read_asset(path: &Path) -> Option<Vec<u8>> {
    path.is_file().then(|| std::fs::read(path).ok()).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_transitions() {
        use BuildStage::*;
        assert!(Idle.can_advance_to(CollectingCatalog));
        assert!(Idle.can_advance_to(Failed));
        assert!(!Idle.can_advance_to(PreparingBuildMap));
        assert!(PreparingBuildMap.can_advance_to(BuildingPlatform(Platform::Android)));
        assert!(BuildingPlatform(Platform::Android).can_advance_to(BuildingPlatform(Platform::Ios)));
        assert!(CollectingCatalog.can_advance_to(WritingReport));
        assert!(!WritingReport.can_advance_to(CollectingCatalog));
        assert!(!Done.can_advance_to(Failed));
        assert!(Done.is_terminal() && Failed.is_terminal());
        assert_eq!(BuildingPlatform(Platform::Ios).to_string(), "BuildingPlatform(IOS)");
    }

    #[test]
    fn invalid_config_fails_without_io() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            output_dir: dir.path().join("out"),
            ..BuildConfig::default()
        };
        let outcome = BuildOrchestrator::new(
            config,
            Box::new(crate::compiler::ArchiveBundleCompiler::default()),
        )
        .run();
        assert!(!outcome.success);
        assert_eq!(outcome.stage, BuildStage::Failed);
        assert_eq!(
            outcome.error.map(|e| e.kind()),
            Some(crate::error::ErrorKind::Configuration)
        );
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn injected_helper_requires_additional_compression() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            output_dir: dir.path().join("out"),
            platforms: vec![Platform::Linux],
            ..BuildConfig::default()
        };
        let outcome = BuildOrchestrator::new(
            config,
            Box::new(crate::compiler::ArchiveBundleCompiler::default()),
        )
        .with_compression(Box::new(crate::compression::GzipCompression::default()))
        .run();
        assert_eq!(outcome.stage, BuildStage::Failed);
        assert!(matches!(outcome.error, Some(BuildError::Configuration(ref m)) if m.contains("gzip")));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn enabled_compression_without_injected_helper_fails_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            output_dir: dir.path().join("out"),
            platforms: vec![Platform::Linux],
            additional_compression: true,
            ..BuildConfig::default()
        };
        let outcome = BuildOrchestrator::new(
            config,
            Box::new(crate::compiler::ArchiveBundleCompiler::default()),
        )
        .run();
        assert!(matches!(outcome.error, Some(BuildError::Configuration(_))));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn compression_without_helper_is_a_configuration_error() {
        let config = BuildConfig {
            additional_compression: true,
            ..BuildConfig::default()
        };
        let registries = Registries::with_defaults().unwrap();
        let err = BuildOrchestrator::from_registries(
            config,
            &registries,
            Box::new(crate::compiler::ArchiveBundleCompiler::default()),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
    }
}
