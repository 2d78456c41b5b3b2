//! # Error Types — Catalog Construction
//!
//! Errors raised while assembling or validating a [`Catalog`](crate::Catalog).
//! Every variant names the offending resource or asset so a failed build
//! log points straight at the collector output that caused it.

use thiserror::Error;

/// Errors from catalog construction and validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A resource or variant name failed validation.
    #[error("invalid name {value:?}: {reason}")]
    InvalidName {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An asset guid could not be parsed.
    #[error("invalid asset guid {0:?}")]
    InvalidGuid(String),

    /// Two resources share the same name and variant.
    #[error("duplicate resource {0}")]
    DuplicateResource(String),

    /// Two distinct keys share a full name, and so an output file name.
    #[error("resource {added} conflicts with {existing}: both are named {full_name:?}")]
    ConflictingResourceName {
        /// The shared `name[.variant]`.
        full_name: String,
        /// The resource already in the catalog.
        existing: String,
        /// The resource being added.
        added: String,
    },

    /// The named resource does not exist in the catalog.
    #[error("resource {0} not found")]
    ResourceNotFound(String),

    /// An asset name is already owned by a resource.
    #[error("asset {asset} already belongs to resource {owner}")]
    DuplicateAsset {
        /// The asset name.
        asset: String,
        /// The resource that already owns it.
        owner: String,
    },

    /// An asset guid is already used by another asset.
    #[error("asset guid {guid} is shared by {first} and {second}")]
    DuplicateGuid {
        /// The shared guid.
        guid: String,
        /// The asset that registered the guid first.
        first: String,
        /// The asset that tried to reuse it.
        second: String,
    },

    /// The named asset does not exist in the catalog.
    #[error("asset {0} not found")]
    AssetNotFound(String),

    /// An asset file referenced by the catalog is missing from disk.
    #[error("asset {asset} not found on disk at {path}")]
    AssetFileMissing {
        /// The asset name.
        asset: String,
        /// The path that was checked.
        path: String,
    },

    /// A resource has no assets.
    #[error("resource {0} has no assets")]
    EmptyResource(String),

    /// A binary resource must contain exactly one asset.
    #[error("binary resource {resource} must contain exactly one asset, found {count}")]
    BinaryResourceAssetCount {
        /// The resource key.
        resource: String,
        /// How many assets it holds.
        count: usize,
    },

    /// An asset depends on a name that no resource contains.
    #[error("asset {asset} depends on unknown asset {dependency}")]
    UnknownDependency {
        /// The dependent asset.
        asset: String,
        /// The dependency that could not be found.
        dependency: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_asset_display_names_owner() {
        let err = CatalogError::DuplicateAsset {
            asset: "Assets/UI/a.png".to_string(),
            owner: "ui".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Assets/UI/a.png"));
        assert!(msg.contains("ui"));
    }

    #[test]
    fn binary_resource_display_includes_count() {
        let err = CatalogError::BinaryResourceAssetCount {
            resource: "config".to_string(),
            count: 3,
        };
        assert!(format!("{err}").contains('3'));
    }

    #[test]
    fn asset_file_missing_display_includes_path() {
        let err = CatalogError::AssetFileMissing {
            asset: "a".to_string(),
            path: "/tmp/assets/a".to_string(),
        };
        assert!(format!("{err}").contains("/tmp/assets/a"));
    }
}
