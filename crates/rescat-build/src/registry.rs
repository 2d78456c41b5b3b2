//! # Helper Registries
//!
//! Event handlers and compression helpers are looked up by tag in an
//! explicit [`Registry`] the host populates at startup. The tag `none` is
//! reserved: it is a first-class [`HelperTag::None`] that resolves to no
//! helper, and cannot be registered.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::collaborators::{BuildEventHandler, CompressionHelper, LogEventHandler};
use crate::compression::GzipCompression;
use crate::error::{BuildError, BuildResult};

/// The reserved tag for "no helper".
pub const NONE_TAG: &str = "none";

/// Selects a registered helper, or none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HelperTag {
    /// No helper.
    #[default]
    None,
    /// A helper registered under this name.
    Named(String),
}

impl HelperTag {
    /// Tag for a registered name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    /// Whether this is the `none` tag.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The tag text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => NONE_TAG,
            Self::Named(name) => name,
        }
    }
}

impl From<String> for HelperTag {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NONE_TAG) {
            Self::None
        } else {
            Self::Named(trimmed.to_string())
        }
    }
}

impl From<HelperTag> for String {
    fn from(tag: HelperTag) -> Self {
        tag.as_str().to_string()
    }
}

impl std::str::FromStr for HelperTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl std::fmt::Display for HelperTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constructs a fresh helper instance.
pub type Factory<T> = Box<dyn Fn() -> Box<T>>;

/// Tag to factory map for one helper kind.
pub struct Registry<T: ?Sized> {
    what: &'static str,
    factories: BTreeMap<String, Factory<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// An empty registry. `what` names the helper kind in errors.
    pub fn new(what: &'static str) -> Self {
        Self {
            what,
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory under a name.
    pub fn register<F>(&mut self, name: &str, factory: F) -> BuildResult<()>
    where
        F: Fn() -> Box<T> + 'static,
    {
        let tag = HelperTag::named(name);
        let HelperTag::Named(name) = tag else {
            return Err(BuildError::Configuration(format!(
                "{NONE_TAG:?} is reserved and cannot name a {}",
                self.what
            )));
        };
        if self.factories.contains_key(&name) {
            return Err(BuildError::Configuration(format!(
                "{} {name:?} is already registered",
                self.what
            )));
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Instantiate the helper a tag selects. `None` for the `none` tag.
    pub fn create(&self, tag: &HelperTag) -> BuildResult<Option<Box<T>>> {
        match tag {
            HelperTag::None => Ok(None),
            HelperTag::Named(name) => match self.factories.get(name) {
                Some(factory) => Ok(Some(factory())),
                None => Err(BuildError::Configuration(format!(
                    "unknown {} {name:?} (registered: {})",
                    self.what,
                    self.names().join(", ")
                ))),
            },
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl<T: ?Sized> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("what", &self.what)
            .field("names", &self.names())
            .finish()
    }
}

/// Every helper registry the build needs.
#[derive(Debug)]
pub struct Registries {
    /// Build event handlers.
    pub event_handlers: Registry<dyn BuildEventHandler>,
    /// Compression helpers.
    pub compression: Registry<dyn CompressionHelper>,
}

impl Registries {
    /// Empty registries.
    pub fn new() -> Self {
        Self {
            event_handlers: Registry::new("build event handler"),
            compression: Registry::new("compression helper"),
        }
    }

    /// Registries with the built-in helpers: `log` and `log-continue`
    /// event handlers, and `gzip` compression.
    pub fn with_defaults() -> BuildResult<Self> {
        let mut registries = Self::new();
        registries
            .event_handlers
            .register("log", || Box::new(LogEventHandler::new(false)))?;
        registries
            .event_handlers
            .register("log-continue", || Box::new(LogEventHandler::new(true)))?;
        registries
            .compression
            .register("gzip", || Box::new(GzipCompression::default()))?;
        Ok(registries)
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}
