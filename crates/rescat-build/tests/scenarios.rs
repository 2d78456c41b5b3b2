//! End-to-end orchestrator scenarios with in-memory collaborators.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use rescat_build::layout::{LOCAL_VERSION_FILE, PACKAGE_VERSION_FILE, UPDATABLE_VERSION_PREFIX};
use rescat_build::{
    AssetCollector, BuildConfig, BuildError, BuildEventHandler, BuildOrchestrator, BuildOutcome,
    BuildParameters, BuildResult, BuildStage, BundleCompiler, BundleDescriptor, BundleManifest,
    CompilerError, ErrorKind, GzipCompression, LogEventHandler, OutputLayout,
};
use rescat_codec::envelope;
use rescat_codec::{FormatVersion, LocalVersionList, PackageVersionList, UpdatableVersionList};
use rescat_core::{Asset, AssetGuid, Catalog, ContentHash, LoadType, Platform, Resource, ResourceKey};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

struct FixedCollector(Option<Catalog>);

impl AssetCollector for FixedCollector {
    fn collect(&mut self, _config: &BuildConfig) -> BuildResult<Catalog> {
        self.0
            .take()
            .ok_or_else(|| BuildError::Fatal("catalog already collected".into()))
    }
}

/// Writes `<key>@<platform>` for every bundle and records each call.
#[derive(Clone, Default)]
struct FakeCompiler {
    calls: Rc<RefCell<Vec<Platform>>>,
    fail_on: Option<Platform>,
}

impl BundleCompiler for FakeCompiler {
    fn compile(
        &mut self,
        platform: Platform,
        bundles: &[BundleDescriptor],
        working_dir: &Path,
    ) -> Result<BundleManifest, CompilerError> {
        self.calls.borrow_mut().push(platform);
        if self.fail_on == Some(platform) {
            return Err(CompilerError("no manifest".into()));
        }
        let mut manifest = BundleManifest::new();
        for bundle in bundles {
            let path = working_dir.join(format!("{}.bundle", bundle.key.full_name()));
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, format!("{}@{platform}", bundle.key).repeat(40)).unwrap();
            manifest.insert(bundle.key.clone(), path);
        }
        Ok(manifest)
    }
}

/// Records every hook call.
struct RecordingHandler {
    events: Rc<RefCell<Vec<String>>>,
    continue_on_failure: bool,
}

impl BuildEventHandler for RecordingHandler {
    fn continue_on_failure(&self) -> bool {
        self.continue_on_failure
    }

    fn pre_process_build_all(&mut self, _params: &BuildParameters<'_>) {
        self.events.borrow_mut().push("pre-all".into());
    }

    fn post_process_build_all(&mut self, _params: &BuildParameters<'_>, success: bool) {
        self.events.borrow_mut().push(format!("post-all:{success}"));
    }

    fn pre_process_build(&mut self, _params: &BuildParameters<'_>, platform: Platform) {
        self.events.borrow_mut().push(format!("pre:{platform}"));
    }

    fn post_process_build(&mut self, _params: &BuildParameters<'_>, platform: Platform, success: bool) {
        self.events
            .borrow_mut()
            .push(format!("post:{platform}:{success}"));
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn key(name: &str) -> ResourceKey {
    ResourceKey::parse(name, None).unwrap()
}

/// `core` (packed) holds the atlas; `dlc` (not packed) holds a level that
/// depends on it.
fn small_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .add_resource(
            Resource::new(key("core"))
                .with_packed(true)
                .with_load_type(LoadType::LoadFromMemoryAndQuickDecrypt)
                .with_group("base"),
        )
        .unwrap();
    catalog
        .add_resource(Resource::new(key("dlc")).with_group("extra"))
        .unwrap();
    catalog
        .add_asset(&key("core"), Asset::new(AssetGuid::random(), "Assets/Atlas.png"))
        .unwrap();
    catalog
        .add_asset(
            &key("dlc"),
            Asset::new(AssetGuid::random(), "Assets/Level.scene")
                .with_dependencies(["Assets/Atlas.png"]),
        )
        .unwrap();
    catalog
}

fn config(dir: &Path, platforms: &[Platform]) -> BuildConfig {
    BuildConfig {
        applicable_version: "1.0.0".into(),
        internal_revision: 3,
        platforms: platforms.to_vec(),
        output_dir: dir.to_path_buf(),
        ..BuildConfig::default()
    }
}

fn layout(config: &BuildConfig) -> OutputLayout {
    OutputLayout::new(
        &config.output_dir,
        &config.applicable_version,
        config.internal_revision,
    )
}

fn orchestrator(config: BuildConfig, catalog: Catalog, compiler: FakeCompiler) -> BuildOrchestrator {
    BuildOrchestrator::new(config, Box::new(compiler))
        .with_collector(Box::new(FixedCollector(Some(catalog))))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn v0_capacity_overflow_fails_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = Catalog::new();
    for i in 0..70_000 {
        let key = key(&format!("r{i:05}"));
        catalog.add_resource(Resource::new(key.clone())).unwrap();
        catalog
            .add_asset(&key, Asset::new(AssetGuid::random(), format!("a{i:05}")))
            .unwrap();
    }
    let config = BuildConfig {
        format_version: FormatVersion::V0,
        ..config(dir.path(), &[Platform::Android])
    };
    let layout = layout(&config);
    let compiler = FakeCompiler::default();
    let calls = compiler.calls.clone();

    let outcome = orchestrator(config, catalog, compiler).run();

    assert!(!outcome.success);
    assert_eq!(outcome.stage, BuildStage::Failed);
    assert_eq!(outcome.error.as_ref().map(BuildError::kind), Some(ErrorKind::Capacity));
    assert!(calls.borrow().is_empty());
    assert!(outcome.platforms.is_empty());
    for tree in ["Package", "Full", "Packed", "Working", "ResourcePack"] {
        assert!(!dir.path().join(tree).exists(), "{tree} was written");
    }
    let report = std::fs::read_to_string(layout.report_file()).unwrap();
    assert!(report.contains("Kind=\"CapacityError\""));
}

#[test]
fn platform_failure_stops_remaining_platforms() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[Platform::Android, Platform::Linux]);
    let layout = layout(&config);
    let compiler = FakeCompiler {
        fail_on: Some(Platform::Linux),
        ..FakeCompiler::default()
    };
    let calls = compiler.calls.clone();
    let events = Rc::new(RefCell::new(Vec::new()));

    let outcome = orchestrator(config, small_catalog(), compiler)
        .with_event_handler(Box::new(RecordingHandler {
            events: events.clone(),
            continue_on_failure: false,
        }))
        .run();

    // Linux builds before Android.
    assert_eq!(*calls.borrow(), [Platform::Linux]);
    assert!(!outcome.success);
    assert_eq!(outcome.platforms.len(), 1);
    assert_eq!(
        outcome.error.as_ref().map(BuildError::kind),
        Some(ErrorKind::PlatformBuild)
    );
    assert_eq!(
        outcome.log.platforms().into_iter().collect::<Vec<_>>(),
        [Platform::Linux]
    );
    assert_eq!(
        *events.borrow(),
        ["pre-all", "pre:Linux", "post:Linux:false", "post-all:false"]
    );

    let report = std::fs::read_to_string(outcome.report_path.unwrap()).unwrap();
    assert_eq!(report.matches("<Platform ").count(), 1);
    assert!(report.contains("Name=\"Linux\""));
    assert!(!report.contains("Name=\"Android\""));
    assert!(!layout.package_dir(Platform::Android).exists());
    assert!(!layout.working_dir(Platform::Linux).exists());
}

#[test]
fn continue_on_failure_builds_remaining_platforms() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[Platform::Android, Platform::Linux]);
    let layout = layout(&config);
    let compiler = FakeCompiler {
        fail_on: Some(Platform::Linux),
        ..FakeCompiler::default()
    };
    let calls = compiler.calls.clone();

    let outcome = orchestrator(config, small_catalog(), compiler)
        .with_event_handler(Box::new(LogEventHandler::new(true)))
        .run();

    assert_eq!(*calls.borrow(), [Platform::Linux, Platform::Android]);
    assert!(!outcome.success);
    assert_eq!(outcome.platforms.len(), 2);
    assert!(!outcome.platforms[0].success);
    assert!(outcome.platforms[1].success);
    assert!(layout
        .package_dir(Platform::Android)
        .join(PACKAGE_VERSION_FILE)
        .is_file());
}

#[test]
fn packed_resources_reach_full_and_packed_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[Platform::Android]);
    let layout = layout(&config);

    let outcome = orchestrator(config, small_catalog(), FakeCompiler::default()).run();
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.stage, BuildStage::Done);

    let full = layout.full_dir(Platform::Android);
    let full_files: Vec<String> = std::fs::read_dir(&full)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(full_files.iter().any(|f| f.starts_with("core.") && f.ends_with(".dat")));
    assert!(full_files.iter().any(|f| f.starts_with("dlc.") && f.ends_with(".dat")));
    let updatable_file = full_files
        .iter()
        .find(|f| f.starts_with(UPDATABLE_VERSION_PREFIX))
        .unwrap();

    let packed = layout.packed_dir(Platform::Android);
    assert!(packed.join("core.dat").is_file());
    assert!(!packed.join("dlc.dat").exists());

    let (local, version) =
        envelope::read::<LocalVersionList>(&std::fs::read(packed.join(LOCAL_VERSION_FILE)).unwrap())
            .unwrap();
    assert_eq!(version, FormatVersion::V2);
    let names: Vec<&str> = local.resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["core"]);

    let (updatable, _) =
        envelope::read::<UpdatableVersionList>(&std::fs::read(full.join(updatable_file)).unwrap())
            .unwrap();
    let names: Vec<&str> = updatable.resources.iter().map(|r| r.entry.name.as_str()).collect();
    assert_eq!(names, ["core", "dlc"]);
    // The level depends on the atlas, which sorts first.
    assert_eq!(updatable.assets[1].name, "Assets/Level.scene");
    assert_eq!(updatable.assets[1].dependency_asset_indexes, vec![0]);

    // Hash-named copies match the hashes in the list.
    for resource in &updatable.resources {
        let name = format!("{}.{}.dat", resource.entry.name, resource.entry.hash.to_hex());
        let stored = std::fs::read(full.join(name)).unwrap();
        assert_eq!(ContentHash::of(&stored), resource.compressed.hash);
    }

    let (package, _) = envelope::read::<PackageVersionList>(
        &std::fs::read(layout.package_dir(Platform::Android).join(PACKAGE_VERSION_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(package.resources.len(), 2);
    assert_eq!(package.resource_groups.len(), 2);
    assert!(!layout.working_dir(Platform::Android).exists());
}

#[test]
fn cancellation_aborts_platform_and_fires_post_hook() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[Platform::Ios]);
    let events = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_in_callback = seen.clone();

    let outcome = orchestrator(config, small_catalog(), FakeCompiler::default())
        .with_event_handler(Box::new(RecordingHandler {
            events: events.clone(),
            continue_on_failure: true,
        }))
        .with_progress(move |progress| {
            seen_in_callback.borrow_mut().push(progress.index);
            progress.index == 1
        })
        .run();

    assert!(!outcome.success);
    assert!(matches!(
        outcome.error,
        Some(BuildError::Cancelled {
            platform: Platform::Ios
        })
    ));
    assert_eq!(*seen.borrow(), [0, 1]);
    assert!(events.borrow().contains(&"post:IOS:false".to_string()));
}

/// Builds Android and iOS, cancelling iOS (built first) at its second bundle.
fn cancel_first_platform(
    dir: &Path,
    continue_on_failure: bool,
) -> (BuildOutcome, Vec<String>, OutputLayout) {
    let config = config(dir, &[Platform::Android, Platform::Ios]);
    let layout = layout(&config);
    let events = Rc::new(RefCell::new(Vec::new()));

    let outcome = orchestrator(config, small_catalog(), FakeCompiler::default())
        .with_event_handler(Box::new(RecordingHandler {
            events: events.clone(),
            continue_on_failure,
        }))
        .with_progress(|progress| progress.platform == Platform::Ios && progress.index == 1)
        .run();
    let events = events.borrow().clone();
    (outcome, events, layout)
}

#[test]
fn cancelled_platform_is_skipped_when_continuing() {
    let dir = tempfile::tempdir().unwrap();
    let (outcome, events, layout) = cancel_first_platform(dir.path(), true);

    assert!(!outcome.success);
    assert!(matches!(
        outcome.error,
        Some(BuildError::Cancelled {
            platform: Platform::Ios
        })
    ));
    let attempted: Vec<(Platform, bool)> =
        outcome.platforms.iter().map(|p| (p.platform, p.success)).collect();
    assert_eq!(attempted, [(Platform::Ios, false), (Platform::Android, true)]);
    assert!(events.contains(&"post:IOS:false".to_string()));
    assert!(events.contains(&"post:Android:true".to_string()));
    assert!(layout
        .package_dir(Platform::Android)
        .join(PACKAGE_VERSION_FILE)
        .is_file());
}

#[test]
fn cancelled_platform_stops_the_build_otherwise() {
    let dir = tempfile::tempdir().unwrap();
    let (outcome, events, layout) = cancel_first_platform(dir.path(), false);

    assert!(!outcome.success);
    assert_eq!(outcome.platforms.len(), 1);
    assert_eq!(outcome.platforms[0].platform, Platform::Ios);
    assert!(!events.iter().any(|e| e.starts_with("pre:Android")));
    assert!(!layout.package_dir(Platform::Android).exists());
}

#[test]
fn error_callback_receives_fatal_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[Platform::Linux]);
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();

    let mut catalog = small_catalog();
    catalog
        .add_resource(Resource::new(key("empty")))
        .unwrap();
    let outcome = orchestrator(config, catalog, FakeCompiler::default())
        .on_error(move |e| sink.borrow_mut().push(e.kind()))
        .run();

    assert!(!outcome.success);
    assert_eq!(*errors.borrow(), [ErrorKind::Catalog]);
    assert!(outcome.report_path.is_some());
}

#[test]
fn compressed_build_with_file_systems_and_resource_pack() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = small_catalog();
    catalog.resource_mut(&key("core")).unwrap().file_system = Some("boot".into());
    let config = BuildConfig {
        use_file_systems: true,
        output_resource_pack: true,
        additional_compression: true,
        ..config(dir.path(), &[Platform::Android])
    };
    let layout = layout(&config);

    let outcome = orchestrator(config, catalog, FakeCompiler::default())
        .with_compression(Box::new(GzipCompression::default()))
        .run();
    assert!(outcome.success, "{:?}", outcome.error);

    let package = layout.package_dir(Platform::Android);
    assert!(package.join("boot.rfs").is_file());
    assert!(!package.join("core.dat").exists());
    assert!(package.join("dlc.dat").is_file());

    let pack_bytes = std::fs::read(layout.resource_pack_file(Platform::Android)).unwrap();
    let (pack, blob) = rescat_build::open_resource_pack(&pack_bytes).unwrap();
    assert_eq!(pack.resources.len(), 2);
    assert_eq!(pack.file_systems.len(), 1);
    assert_eq!(pack.file_systems[0].resource_indexes, vec![0]);
    let core = &pack.resources[0];
    let stored = &blob[core.range().start as usize..core.range().end as usize];
    let restored = rescat_build::payload::restore_payload(
        stored,
        core.entry.load_type,
        core.entry.hash,
        Some(&GzipCompression::default()),
    )
    .unwrap();
    assert_eq!(ContentHash::of(&restored), core.entry.hash);
    assert!(String::from_utf8(restored).unwrap().starts_with("core@Android"));

    let report = std::fs::read_to_string(layout.report_file()).unwrap();
    assert!(report.contains("<UpdatableVersionList "));
    assert!(report.contains("Compression=\"gzip\""));
    assert!(report.contains("AdditionalCompression=\"true\""));
}
