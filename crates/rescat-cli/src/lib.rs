//! # rescat-cli — Resource Catalog Command-Line Interface
//!
//! ## Subcommands
//!
//! - `build`: BuildResources. Load `rescat.yaml`, overlay flags, build
//! - `inspect`: decode a version list, resource pack or `.rfs` container
//!   and print it as JSON
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to `rescat-build` and `rescat-codec`.
//! - Handlers return the process exit code.

pub mod build;
pub mod inspect;
