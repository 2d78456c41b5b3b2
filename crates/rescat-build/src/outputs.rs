//! # Output Trees
//!
//! Writes processed payloads into the Package, Full and Packed trees of one
//! platform, loose or inside `.rfs` containers, and feeds the resource pack.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rescat_codec::{FileSystemEntry, FormatVersion};
use rescat_core::{Platform, Resource};

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::filesystem::FileSystemWriter;
use crate::layout::{full_file_name, resource_file_name, OutputLayout};
use crate::lists::resource_entry;
use crate::payload::ProcessedPayload;
use crate::resource_pack::ResourcePackBuilder;

/// Write `bytes` to `path`, creating parent directories.
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    std::fs::write(path, bytes).map_err(|e| BuildError::io(path, e))
}

/// One output tree.
#[derive(Debug)]
pub struct TreeWriter {
    dir: PathBuf,
    use_file_systems: bool,
    containers: BTreeMap<String, FileSystemWriter>,
    names: BTreeSet<(Option<String>, String)>,
    written: usize,
}

impl TreeWriter {
    /// A tree rooted at `dir`.
    pub fn new(dir: PathBuf, use_file_systems: bool) -> Self {
        Self {
            dir,
            use_file_systems,
            containers: BTreeMap::new(),
            names: BTreeSet::new(),
            written: 0,
        }
    }

    /// The tree root.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store a file, inside its container when file systems are enabled.
    ///
    /// A tree never stores the same name twice in one place.
    pub fn put(&mut self, file_system: Option<&str>, name: String, bytes: &[u8]) -> BuildResult<()> {
        let file_system = file_system.filter(|_| self.use_file_systems);
        if !self.names.insert((file_system.map(str::to_string), name.clone())) {
            return Err(BuildError::Fatal(format!(
                "{} written twice in {}",
                name,
                self.dir.display()
            )));
        }
        match file_system {
            Some(fs) => self
                .containers
                .entry(fs.to_string())
                .or_default()
                .add(name, bytes.to_vec()),
            None => write_file(&self.dir.join(name), bytes)?,
        }
        self.written += 1;
        Ok(())
    }

    /// Flush containers; returns the number of files stored.
    pub fn finish(self) -> BuildResult<usize> {
        for (name, container) in &self.containers {
            container.write(&self.dir, name)?;
        }
        Ok(self.written)
    }
}

/// All trees of one platform.
#[derive(Debug)]
pub struct PlatformOutputs {
    package: Option<TreeWriter>,
    full: Option<TreeWriter>,
    packed: Option<TreeWriter>,
    pack: Option<(PathBuf, ResourcePackBuilder)>,
    version: FormatVersion,
}

impl PlatformOutputs {
    /// Writers for the trees the configuration enables.
    pub fn new(config: &BuildConfig, layout: &OutputLayout, platform: Platform) -> Self {
        let tree = |enabled: bool, dir: PathBuf| {
            enabled.then(|| TreeWriter::new(dir, config.use_file_systems))
        };
        Self {
            package: tree(config.output_package, layout.package_dir(platform)),
            full: tree(config.output_full, layout.full_dir(platform)),
            packed: tree(config.output_packed, layout.packed_dir(platform)),
            pack: config
                .output_resource_pack
                .then(|| (layout.resource_pack_file(platform), ResourcePackBuilder::new())),
            version: config.format_version,
        }
    }

    /// Store one processed resource in every enabled tree it belongs to.
    pub fn add(&mut self, resource: &Resource, payload: &ProcessedPayload) -> BuildResult<()> {
        let key = resource.key();
        let extension = resource.extension.as_deref();
        let file_system = resource.file_system.as_deref();
        if let Some(tree) = &mut self.package {
            tree.put(file_system, resource_file_name(key, extension), &payload.stored)?;
        }
        if let Some(tree) = &mut self.full {
            tree.put(
                file_system,
                full_file_name(key, payload.code.hash, extension),
                &payload.compressed,
            )?;
        }
        if resource.packed {
            if let Some(tree) = &mut self.packed {
                tree.put(file_system, resource_file_name(key, extension), &payload.stored)?;
            }
        }
        if let Some((_, pack)) = &mut self.pack {
            pack.add(resource_entry(resource, &payload.code), &payload.compressed)?;
        }
        Ok(())
    }

    /// Flush every tree and the resource pack.
    pub fn finish(self, pack_file_systems: Vec<FileSystemEntry>) -> BuildResult<()> {
        for tree in [self.package, self.full, self.packed].into_iter().flatten() {
            let dir = tree.dir().to_path_buf();
            let written = tree.finish()?;
            tracing::debug!(dir = %dir.display(), written, "output tree flushed");
        }
        if let Some((path, pack)) = self.pack {
            pack.with_file_systems(pack_file_systems)
                .write(&path, self.version)?;
        }
        Ok(())
    }
}
