//! # Output Layout
//!
//! ```text
//! <output>/
//!   Working/<platform>/                         compiler output, removed after use
//!   Package/<version>_<revision>/<platform>/    every resource + PackageVersion.dat
//!   Full/<version>_<revision>/<platform>/       hash-named copies + UpdatableVersion.<hash>.dat
//!   Packed/<version>_<revision>/<platform>/     packed subset + LocalVersion.dat
//!   ResourcePack/<platform>/<version>_<revision>.rpk
//!   BuildReport/<version>_<revision>/BuildReport.xml
//!   BuildReport/<version>_<revision>/BuildLog.txt
//! ```

use std::path::{Path, PathBuf};

use rescat_core::{ContentHash, Platform, ResourceKey};

/// Version list file in every Package tree.
pub const PACKAGE_VERSION_FILE: &str = "PackageVersion.dat";
/// Version list file in every Packed tree.
pub const LOCAL_VERSION_FILE: &str = "LocalVersion.dat";
/// Name prefix of the hash-named Updatable list in every Full tree.
pub const UPDATABLE_VERSION_PREFIX: &str = "UpdatableVersion";
/// Report file name.
pub const REPORT_FILE: &str = "BuildReport.xml";
/// Log file name.
pub const LOG_FILE: &str = "BuildLog.txt";
/// Extension used when a resource has no override.
pub const DEFAULT_EXTENSION: &str = "dat";
/// Extension of container file systems.
pub const FILE_SYSTEM_EXTENSION: &str = "rfs";
/// Extension of resource pack files.
pub const RESOURCE_PACK_EXTENSION: &str = "rpk";

/// Paths of every output tree for one version and revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    version_dir: String,
}

impl OutputLayout {
    /// Layout under `root` for a version and revision.
    pub fn new(root: impl Into<PathBuf>, version: &str, revision: u32) -> Self {
        Self {
            root: root.into(),
            version_dir: format!("{}_{}", version.replace('.', "_"), revision),
        }
    }

    /// The output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<version>_<revision>` with dots replaced.
    pub fn version_dir(&self) -> &str {
        &self.version_dir
    }

    /// Intermediate compiler output for a platform.
    pub fn working_dir(&self, platform: Platform) -> PathBuf {
        self.root.join("Working").join(platform.as_str())
    }

    /// Package tree for a platform.
    pub fn package_dir(&self, platform: Platform) -> PathBuf {
        self.tree("Package", platform)
    }

    /// Full tree for a platform.
    pub fn full_dir(&self, platform: Platform) -> PathBuf {
        self.tree("Full", platform)
    }

    /// Packed tree for a platform.
    pub fn packed_dir(&self, platform: Platform) -> PathBuf {
        self.tree("Packed", platform)
    }

    /// Resource pack file for a platform.
    pub fn resource_pack_file(&self, platform: Platform) -> PathBuf {
        self.root
            .join("ResourcePack")
            .join(platform.as_str())
            .join(format!("{}.{RESOURCE_PACK_EXTENSION}", self.version_dir))
    }

    /// Report directory.
    pub fn report_dir(&self) -> PathBuf {
        self.root.join("BuildReport").join(&self.version_dir)
    }

    /// Report file.
    pub fn report_file(&self) -> PathBuf {
        self.report_dir().join(REPORT_FILE)
    }

    /// Log file.
    pub fn log_file(&self) -> PathBuf {
        self.report_dir().join(LOG_FILE)
    }

    fn tree(&self, kind: &str, platform: Platform) -> PathBuf {
        self.root
            .join(kind)
            .join(&self.version_dir)
            .join(platform.as_str())
    }
}

/// `name[.variant].<ext>`: the loose file name in Package and Packed trees.
pub fn resource_file_name(key: &ResourceKey, extension: Option<&str>) -> String {
    format!(
        "{}.{}",
        key.full_name(),
        extension.unwrap_or(DEFAULT_EXTENSION)
    )
}

/// `name[.variant].<hash8hex>.<ext>`: the hash-named file in Full trees.
pub fn full_file_name(key: &ResourceKey, hash: ContentHash, extension: Option<&str>) -> String {
    format!(
        "{}.{}.{}",
        key.full_name(),
        hash.to_hex(),
        extension.unwrap_or(DEFAULT_EXTENSION)
    )
}

/// `UpdatableVersion.<hash8hex>.dat`.
pub fn updatable_version_file(hash: ContentHash) -> String {
    format!("{UPDATABLE_VERSION_PREFIX}.{}.{DEFAULT_EXTENSION}", hash.to_hex())
}

/// `<name>.rfs`.
pub fn file_system_file_name(name: &str) -> String {
    format!("{name}.{FILE_SYSTEM_EXTENSION}")
}
