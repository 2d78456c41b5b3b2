//! # Build Configuration
//!
//! [`BuildConfig`] is stored as YAML (default file `rescat.yaml`). A build
//! loads it, overlays whatever the caller supplied through a
//! [`BuildRequest`] (last supplied value wins), validates it before any
//! I/O, and saves it back only when the build succeeds.

use std::path::{Path, PathBuf};

use rescat_codec::FormatVersion;
use rescat_core::Platform;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};
use crate::registry::HelperTag;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "rescat.yaml";

/// Persistent build settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Application version the catalog applies to.
    pub applicable_version: String,
    /// Build revision within that version.
    pub internal_revision: u32,
    /// Platforms to build. Built in fixed platform order.
    pub platforms: Vec<Platform>,
    /// Root of every output tree.
    pub output_dir: PathBuf,
    /// Directory asset names are resolved against, when assets live on disk.
    pub asset_root: Option<PathBuf>,
    /// Catalog description read by the YAML collector.
    pub catalog_file: PathBuf,
    /// Build event handler tag.
    pub event_handler: HelperTag,
    /// Compression helper tag.
    pub compression: HelperTag,
    /// Version list layout to write.
    pub format_version: FormatVersion,
    /// Write resources that name a file system into `.rfs` containers.
    pub use_file_systems: bool,
    /// Write the Package tree.
    pub output_package: bool,
    /// Write the Full tree.
    pub output_full: bool,
    /// Write the Packed tree.
    pub output_packed: bool,
    /// Also write a single-file resource pack per platform.
    pub output_resource_pack: bool,
    /// Compress payloads with the compression helper.
    pub additional_compression: bool,
    /// Clear working directories before compiling.
    pub force_rebuild: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            applicable_version: "0.1.0".to_string(),
            internal_revision: 0,
            platforms: Vec::new(),
            output_dir: PathBuf::new(),
            asset_root: None,
            catalog_file: PathBuf::from("catalog.yaml"),
            event_handler: HelperTag::None,
            compression: HelperTag::None,
            format_version: FormatVersion::LATEST,
            use_file_systems: false,
            output_package: true,
            output_full: true,
            output_packed: true,
            output_resource_pack: false,
            additional_compression: false,
            force_rebuild: false,
        }
    }
}

impl BuildConfig {
    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> BuildResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(BuildError::io(path, e)),
        };
        serde_yaml::from_str(&content).map_err(|source| BuildError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> BuildResult<()> {
        let yaml = serde_yaml::to_string(self).map_err(|source| BuildError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        std::fs::write(path, yaml).map_err(|e| BuildError::io(path, e))
    }

    /// Apply caller-supplied values.
    pub fn apply(&mut self, request: &BuildRequest) {
        if let Some(version) = &request.version {
            self.applicable_version = version.clone();
        }
        if let Some(revision) = request.internal_revision {
            self.internal_revision = revision;
        }
        if let Some(platforms) = &request.platforms {
            self.platforms = platforms.clone();
        }
        if let Some(output_dir) = &request.output_dir {
            self.output_dir = output_dir.clone();
        }
        if let Some(handler) = &request.event_handler {
            self.event_handler = handler.clone();
        }
        if let Some(format_version) = request.format_version {
            self.format_version = format_version;
        }
    }

    /// Reject settings a build cannot start with.
    pub fn validate(&self) -> BuildResult<()> {
        if self.applicable_version.trim().is_empty() {
            return Err(BuildError::Configuration(
                "applicable version is empty".into(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(BuildError::Configuration(
                "output directory is not set".into(),
            ));
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(BuildError::Configuration(format!(
                "output directory {} is not a directory",
                self.output_dir.display()
            )));
        }
        if self.platforms.is_empty() {
            return Err(BuildError::Configuration("no platform selected".into()));
        }
        if !(self.output_package || self.output_full || self.output_packed) {
            return Err(BuildError::Configuration(
                "no output tree is enabled".into(),
            ));
        }
        if self.use_file_systems && !self.format_version.has_file_systems() {
            return Err(BuildError::Configuration(format!(
                "file systems need format V2 or later, configured {}",
                self.format_version
            )));
        }
        if self.output_resource_pack && !self.output_full {
            return Err(BuildError::Configuration(
                "a resource pack is built from the Full output, which is disabled".into(),
            ));
        }
        Ok(())
    }

    /// The platforms to build, deduplicated, in build order.
    pub fn build_order(&self) -> Vec<Platform> {
        Platform::in_build_order(&self.platforms)
    }
}

/// Values supplied for one build. Unset fields keep the saved config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    /// Applicable version.
    pub version: Option<String>,
    /// Internal revision.
    pub internal_revision: Option<u32>,
    /// Platforms.
    pub platforms: Option<Vec<Platform>>,
    /// Output directory.
    pub output_dir: Option<PathBuf>,
    /// Event handler tag.
    pub event_handler: Option<HelperTag>,
    /// Format version.
    pub format_version: Option<FormatVersion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BuildConfig {
        BuildConfig {
            platforms: vec![Platform::Windows64],
            output_dir: PathBuf::from("out"),
            ..BuildConfig::default()
        }
    }

    #[test]
    fn defaults_fail_validation_without_output_or_platform() {
        let err = BuildConfig::default().validate().unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn no_platform_is_a_configuration_error() {
        let config = BuildConfig {
            platforms: Vec::new(),
            ..valid()
        };
        assert!(config.validate().unwrap_err().to_string().contains("no platform"));
    }

    #[test]
    fn file_systems_require_v2() {
        let config = BuildConfig {
            use_file_systems: true,
            format_version: FormatVersion::V1,
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn no_output_tree_rejected() {
        let config = BuildConfig {
            output_package: false,
            output_full: false,
            output_packed: false,
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn request_overrides_only_supplied_fields() {
        let mut config = valid();
        config.apply(&BuildRequest {
            version: Some("2.0".into()),
            platforms: Some(vec![Platform::Android, Platform::Ios]),
            ..BuildRequest::default()
        });
        assert_eq!(config.applicable_version, "2.0");
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.build_order(), vec![Platform::Ios, Platform::Android]);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILE);
        let config = BuildConfig {
            compression: HelperTag::named("gzip"),
            additional_compression: true,
            ..valid()
        };
        config.save(&path).unwrap();
        assert_eq!(BuildConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = BuildConfig::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(loaded, BuildConfig::default());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: BuildConfig =
            serde_yaml::from_str("platforms: [android]\noutput_dir: build\nformat_version: v0\n")
                .unwrap();
        assert_eq!(config.platforms, vec![Platform::Android]);
        assert_eq!(config.format_version, FormatVersion::V0);
        assert!(config.output_full);
        assert!(config.event_handler.is_none());
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "platforms: [nowhere]").unwrap();
        let err = BuildConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }
}
