//! # Identity Newtypes
//!
//! Validated identifiers for catalog entries. A [`ResourceName`] becomes a
//! relative path in every output tree, so it is checked for traversal and
//! reserved characters at construction time. A [`Variant`] becomes a file
//! name suffix and may not contain separators at all.
//!
//! ## Ordering
//!
//! [`ResourceKey`] orders by name, then variant (no variant first), using
//! ordinal byte comparison. Every sorted table in the version lists relies
//! on this ordering.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CatalogError;

/// Characters that are never allowed in a resource or variant name.
const RESERVED_CHARS: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

/// Deserialize a string newtype by routing through its validating `new()`.
macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

fn invalid(value: &str, reason: impl Into<String>) -> CatalogError {
    CatalogError::InvalidName {
        value: value.to_string(),
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// ResourceName
// ---------------------------------------------------------------------------

/// The logical name of a resource, e.g. `ui/main_menu`.
///
/// Forward slashes separate directories. Empty, `.` and `..` segments are
/// rejected, as are absolute names and reserved characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    /// Create a validated resource name.
    pub fn new(name: impl Into<String>) -> Result<Self, CatalogError> {
        let name = name.into();
        if name.is_empty() {
            return Err(invalid(&name, "resource name is empty"));
        }
        if let Some(c) = name
            .chars()
            .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
        {
            return Err(invalid(&name, format!("contains reserved character {c:?}")));
        }
        for segment in name.split('/') {
            match segment {
                "" => return Err(invalid(&name, "contains an empty path segment")),
                "." | ".." => return Err(invalid(&name, "contains a relative path segment")),
                _ => {}
            }
        }
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl_validating_deserialize!(ResourceName);

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// A resource variant, e.g. `en-us` or `hd`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Variant(String);

impl Variant {
    /// Create a validated variant.
    pub fn new(variant: impl Into<String>) -> Result<Self, CatalogError> {
        let variant = variant.into();
        if variant.is_empty() {
            return Err(invalid(&variant, "variant is empty"));
        }
        if let Some(c) = variant
            .chars()
            .find(|c| *c == '/' || *c == '.' || RESERVED_CHARS.contains(c) || c.is_control())
        {
            return Err(invalid(&variant, format!("contains reserved character {c:?}")));
        }
        Ok(Self(variant))
    }

    /// The variant as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl_validating_deserialize!(Variant);

// ---------------------------------------------------------------------------
// ResourceKey
// ---------------------------------------------------------------------------

/// The unique key of a resource: name plus optional variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Resource name.
    pub name: ResourceName,
    /// Optional variant.
    pub variant: Option<Variant>,
}

impl ResourceKey {
    /// Build a key from a name and optional variant.
    pub fn new(name: ResourceName, variant: Option<Variant>) -> Self {
        Self { name, variant }
    }

    /// Parse a key from raw strings.
    pub fn parse(name: &str, variant: Option<&str>) -> Result<Self, CatalogError> {
        Ok(Self {
            name: ResourceName::new(name)?,
            variant: variant.map(Variant::new).transpose()?,
        })
    }

    /// `name` or `name.variant`.
    pub fn full_name(&self) -> String {
        match &self.variant {
            Some(v) => format!("{}.{}", self.name, v),
            None => self.name.to_string(),
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.variant {
            Some(v) => write!(f, "{}.{}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// AssetGuid
// ---------------------------------------------------------------------------

/// The stable external identifier of an asset.
///
/// Accepts both the 32-digit simple form and the hyphenated form; always
/// displays in the simple form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetGuid(Uuid);

impl AssetGuid {
    /// Parse a guid string.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CatalogError> {
        let raw = raw.as_ref();
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| CatalogError::InvalidGuid(raw.to_string()))
    }

    /// Generate a new random guid.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for AssetGuid {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AssetGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl Serialize for AssetGuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AssetGuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
