//! # Inspect CLI — decode build outputs as JSON.
//!
//! Accepts any enveloped version list (`PackageVersion.dat`,
//! `UpdatableVersion.*.dat`, `LocalVersion.dat`), a resource pack (`.rpk`,
//! header only) or an `.rfs` container. Gzip-compressed input is unwrapped
//! first, so updatable lists stored compressed decode directly.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Value};

use rescat_build::filesystem::MAGIC;
use rescat_build::{CompressionHelper, FileSystemArchive, GzipCompression};
use rescat_codec::envelope;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Inspect subcommand arguments.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// File to decode.
    pub file: PathBuf,

    /// Print compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

/// Decode `bytes` into a JSON description.
pub fn inspect_bytes(bytes: &[u8]) -> Result<Value> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let plain = GzipCompression::default()
            .decompress(bytes)
            .context("failed to decompress gzip input")?;
        let mut inner = inspect_bytes(&plain)?;
        if let Value::Object(map) = &mut inner {
            map.insert("compressed".into(), Value::Bool(true));
        }
        return Ok(inner);
    }

    if bytes.starts_with(MAGIC) {
        let archive = FileSystemArchive::parse(bytes).context("invalid file system container")?;
        let entries: Vec<Value> = archive
            .names()
            .map(|name| {
                let length = archive.get(name).map_or(0, <[u8]>::len);
                json!({ "name": name, "length": length })
            })
            .collect();
        return Ok(json!({
            "kind": "file_system",
            "entry_count": archive.len(),
            "entries": entries,
        }));
    }

    let (list, version) = envelope::read_any(bytes).context("not a version list")?;
    Ok(json!({
        "kind": list.kind().as_str(),
        "format_version": version,
        "resource_count": list.resource_count(),
        "list": serde_json::to_value(&list)?,
    }))
}

/// Execute the inspect subcommand.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let value = inspect_bytes(&bytes)
        .with_context(|| format!("failed to decode {}", args.file.display()))?;
    let text = if args.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    println!("{text}");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescat_build::FileSystemWriter;
    use rescat_codec::{FormatVersion, LocalVersionList, ResourceEntry};
    use rescat_core::{ContentHash, LoadType};

    fn local_list() -> Vec<u8> {
        let list = LocalVersionList::new(vec![ResourceEntry::new(
            "boot",
            LoadType::LoadFromFile,
            12,
            ContentHash::from_u32(0xabcd),
        )]);
        envelope::write(&list, FormatVersion::V1).unwrap()
    }

    #[test]
    fn version_list_is_described() {
        let value = inspect_bytes(&local_list()).unwrap();
        assert_eq!(value["resource_count"], 1);
        assert_eq!(value["kind"], envelope::ListKind::Local.as_str());
        assert!(value.get("compressed").is_none());
    }

    #[test]
    fn gzip_input_is_unwrapped() {
        let packed = GzipCompression::default().compress(&local_list()).unwrap();
        let value = inspect_bytes(&packed).unwrap();
        assert_eq!(value["resource_count"], 1);
        assert_eq!(value["compressed"], true);
    }

    #[test]
    fn containers_list_their_entries() {
        let mut fs = FileSystemWriter::new();
        fs.add("ui.dat", vec![1, 2, 3]);
        fs.add("core.dat", vec![9; 10]);
        let value = inspect_bytes(&fs.to_bytes().unwrap()).unwrap();
        assert_eq!(value["kind"], "file_system");
        assert_eq!(value["entry_count"], 2);
        assert_eq!(value["entries"][0]["name"], "core.dat");
        assert_eq!(value["entries"][0]["length"], 10);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(inspect_bytes(b"not a list").is_err());
    }

    #[test]
    fn run_inspect_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LocalVersion.dat");
        std::fs::write(&path, local_list()).unwrap();
        let args = InspectArgs {
            file: path,
            compact: true,
        };
        assert_eq!(run_inspect(&args).unwrap(), 0);

        let missing = InspectArgs {
            file: dir.path().join("absent.dat"),
            compact: false,
        };
        assert!(run_inspect(&missing).is_err());
    }
}
