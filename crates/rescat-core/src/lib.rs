//! # rescat-core — Catalog Model
//!
//! The leaf crate of the rescat workspace. It defines the in-memory
//! representation of a resource catalog: resources (bundles) keyed by
//! name and optional variant, the assets each resource owns, the
//! dependency edges between assets, and the per-platform build outcome
//! recorded for every resource.
//!
//! ## Key Design Principles
//!
//! 1. **Validated newtypes for names.** `ResourceName`, `Variant` and
//!    `AssetGuid` reject malformed input at construction time, so every
//!    downstream path segment and wire string is well formed.
//!
//! 2. **One owner per asset.** The catalog refuses to place an asset name
//!    in two resources. Duplicate names would make the binary-search index
//!    ambiguous.
//!
//! 3. **Sorted iteration.** Resources live in a `BTreeMap` keyed by
//!    `ResourceKey`, so iteration order is ordinal and independent of the
//!    order the collector discovered them in.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rescat-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod catalog;
pub mod error;
pub mod hash;
pub mod identity;
pub mod load_type;
pub mod platform;

pub use catalog::{Asset, Catalog, PlatformCode, Resource};
pub use error::CatalogError;
pub use hash::ContentHash;
pub use identity::{AssetGuid, ResourceKey, ResourceName, Variant};
pub use load_type::{LoadType, Obfuscation, QUICK_ENCRYPT_LENGTH};
pub use platform::Platform;
