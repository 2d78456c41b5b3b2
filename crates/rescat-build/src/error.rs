//! # Build Errors
//!
//! One error enum for the whole pipeline. [`BuildError::kind`] maps every
//! variant onto the five outcome classes the orchestrator acts on:
//!
//! | Kind | Effect |
//! |---|---|
//! | Configuration | Build aborts before any file is touched. |
//! | Catalog | Build aborts; partial outputs stay for inspection. |
//! | Capacity | Fatal; a value does not fit its format field. Never truncated. |
//! | PlatformBuild | Logged per platform; `continue_on_failure` decides the rest. |
//! | Fatal | Anything else. Logged, reported, report still flushed. |

use std::path::PathBuf;

use rescat_codec::{CodecError, ResolveError};
use rescat_core::{CatalogError, Platform};
use thiserror::Error;

/// Convenience alias.
pub type BuildResult<T> = Result<T, BuildError>;

/// Outcome class of a build error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing configuration.
    Configuration,
    /// Broken catalog contents.
    Catalog,
    /// A value exceeds a format field.
    Capacity,
    /// A single platform failed or was cancelled.
    PlatformBuild,
    /// Anything else.
    Fatal,
}

impl ErrorKind {
    /// Stable name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::Catalog => "CatalogError",
            Self::Capacity => "CapacityError",
            Self::PlatformBuild => "PlatformBuildError",
            Self::Fatal => "FatalError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the build pipeline.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Invalid configuration: missing output directory, no platform, etc.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The catalog violates an invariant.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Asset names could not be resolved to indexes.
    #[error("catalog error: {0}")]
    Resolve(#[from] ResolveError),

    /// A value does not fit the target format.
    #[error("capacity error: {0}")]
    Capacity(CodecError),

    /// Version list encoding failed for a reason other than capacity.
    #[error("version list error: {0}")]
    Codec(CodecError),

    /// A platform build failed.
    #[error("platform {platform} failed: {reason}")]
    Platform {
        /// The failing platform.
        platform: Platform,
        /// What went wrong.
        reason: String,
    },

    /// The progress callback asked to stop.
    #[error("build of platform {platform} cancelled")]
    Cancelled {
        /// The platform being built when cancellation was requested.
        platform: Platform,
    },

    /// A compression helper failed.
    #[error("compression helper {helper} failed: {reason}")]
    Compression {
        /// The helper tag.
        helper: String,
        /// What went wrong.
        reason: String,
    },

    /// Unexpected failure anywhere in the pipeline.
    #[error("fatal error: {0}")]
    Fatal(String),

    /// File system error with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A YAML file could not be parsed or written.
    #[error("failed to process YAML at {path}: {source}")]
    Yaml {
        /// The YAML file.
        path: PathBuf,
        /// The underlying error.
        source: serde_yaml::Error,
    },

    /// The build report could not be serialized.
    #[error("XML serialization error: {0}")]
    Xml(String),
}

impl From<CodecError> for BuildError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Resolve(inner) => Self::Resolve(inner),
            e if e.is_capacity() => Self::Capacity(e),
            e => Self::Codec(e),
        }
    }
}

impl BuildError {
    /// Wrap an I/O error with its path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The outcome class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Catalog(_) | Self::Resolve(_) => ErrorKind::Catalog,
            Self::Capacity(_) => ErrorKind::Capacity,
            Self::Platform { .. } | Self::Cancelled { .. } => ErrorKind::PlatformBuild,
            Self::Codec(_)
            | Self::Compression { .. }
            | Self::Fatal(_)
            | Self::Io { .. }
            | Self::Yaml { .. }
            | Self::Xml(_) => ErrorKind::Fatal,
        }
    }

    /// Whether this failure is confined to one platform.
    pub fn is_platform_failure(&self) -> bool {
        self.kind() == ErrorKind::PlatformBuild
    }
}
