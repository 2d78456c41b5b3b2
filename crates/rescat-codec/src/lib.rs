//! # rescat-codec — Version List Codec
//!
//! Binary serializers for the four version list kinds a runtime loader
//! reads:
//!
//! - **Package** ([`PackageVersionList`]): every resource with its assets,
//!   dependencies, file systems and resource groups, for standalone
//!   deployment.
//! - **Updatable** ([`UpdatableVersionList`]): the same tables plus the
//!   compressed length and hash of each downloadable payload.
//! - **Local** ([`LocalVersionList`]): the flat resource table of the
//!   read-only packed container.
//! - **ResourcePack** ([`ResourcePackVersionList`]): the header of a single
//!   concatenated data blob, with per-resource byte offsets.
//!
//! Each kind has three layouts selected by [`FormatVersion`]. The caller
//! always supplies the version; the codec never guesses it. The optional
//! [`envelope`] module adds a kind/version signature for files on disk.
//!
//! ## Obfuscation
//!
//! Every variable-length string is XOR-encrypted ([`cipher`]) with either
//! the file's random 4-byte salt or the owning resource's content hash.
//! Key material lives in buffers owned by each encode/decode call.
//!
//! ## Index resolution
//!
//! Asset dependencies are stored as integer indices into an ordinally
//! sorted asset table. [`resolver`] builds that table deterministically
//! and looks names up with an iterative binary search.

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod indexed;
pub mod local;
pub mod model;
pub mod resolver;
pub mod resource_pack;
pub mod version;
pub mod wire;

pub use cipher::{random_salt, StringKey};
pub use envelope::{AnyVersionList, ListKind};
pub use error::CodecError;
pub use indexed::{
    Compressed, CompressionFields, IndexedResource, IndexedVersionList, PackageResource, PackageVersionList,
    Uncompressed, UpdatableResource, UpdatableVersionList,
};
pub use local::LocalVersionList;
pub use model::{Asset, FileSystemEntry, ResourceEntry, ResourceGroupEntry};
pub use resolver::{binary_search, BuildMap, IndexResolver, ResolveError, ResolvedAssets};
pub use resource_pack::{PackedResource, ResourcePackVersionList};
pub use version::{FormatVersion, VersionListCodec};
