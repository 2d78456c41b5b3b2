//! # rescat-build — Build Orchestration
//!
//! Turns a catalog into deployable per-platform outputs:
//!
//! - **Collection** (`collection.rs`, `collaborators.rs`): the catalog comes
//!   from an [`AssetCollector`] and its dependencies from a
//!   [`DependencyAnalyzer`].
//! - **Compilation** (`compiler.rs`): a [`BundleCompiler`] produces one file
//!   per bundle. Its output is opaque to the build.
//! - **Payloads** (`payload.rs`, `compression.rs`): hashing, load-type
//!   obfuscation and optional compression.
//! - **Outputs** (`outputs.rs`, `filesystem.rs`, `resource_pack.rs`): the
//!   Package, Full and Packed trees, `.rfs` containers and `.rpk` packs.
//! - **Version lists** (`lists.rs`): Package, Updatable and Local lists per
//!   platform, encoded by `rescat-codec`.
//! - **Report** (`report.rs`): `BuildReport.xml` and `BuildLog.txt`.
//!
//! [`BuildOrchestrator`] sequences all of it; [`build_resources`] is the
//! configuration-driven entry point.
//!
//! ## Crate Policy
//!
//! - Single-threaded and synchronous. Collaborator calls block.
//! - Configuration is validated before any file is touched.
//! - Values that do not fit a format field fail the build. Nothing is
//!   truncated.

pub mod collaborators;
pub mod collection;
pub mod compiler;
pub mod compression;
pub mod config;
pub mod entry;
pub mod error;
pub mod filesystem;
pub mod layout;
pub mod lists;
pub mod orchestrator;
pub mod outputs;
pub mod payload;
pub mod registry;
pub mod report;
pub mod resource_pack;

pub use collaborators::{
    AssetCollector, BuildEventHandler, BuildParameters, BuildProgress, BundleCompiler,
    BundleDescriptor, BundleManifest, CompilerError, CompressionHelper, DeclaredDependencies,
    DependencyAnalyzer, LogEventHandler,
};
pub use collection::YamlCatalogCollector;
pub use compiler::ArchiveBundleCompiler;
pub use compression::GzipCompression;
pub use config::{BuildConfig, BuildRequest, DEFAULT_CONFIG_FILE};
pub use entry::{build_resources, BuildEnvironment};
pub use error::{BuildError, BuildResult, ErrorKind};
pub use filesystem::{FileSystemArchive, FileSystemWriter};
pub use layout::OutputLayout;
pub use orchestrator::{BuildOrchestrator, BuildOutcome, BuildStage, PlatformOutcome};
pub use registry::{HelperTag, Registries, Registry};
pub use report::{BuildLog, BuildReport};
pub use resource_pack::{open_resource_pack, ResourcePackBuilder};
