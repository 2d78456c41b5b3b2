//! # Build CLI — run BuildResources from the command line.
//!
//! Loads the persisted configuration, overlays the flags given and runs the
//! build. Values used by a successful build are written back.
//!
//! ## Usage
//!
//! ```bash
//! # Build with the saved settings:
//! rescat build
//!
//! # Override version, revision and platforms:
//! rescat build --app-version 1.2.0 --revision 14 --platform Android,IOS
//!
//! # A different configuration file and format version:
//! rescat build --config ci/rescat.yaml --format v2
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use rescat_build::{
    build_resources, BuildEnvironment, BuildRequest, HelperTag, DEFAULT_CONFIG_FILE,
};
use rescat_codec::FormatVersion;
use rescat_core::Platform;

/// Build subcommand arguments.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Configuration file to load and update.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Applicable game version.
    #[arg(long)]
    pub app_version: Option<String>,

    /// Internal resource revision.
    #[arg(long)]
    pub revision: Option<u32>,

    /// Target platforms (repeat or comma-separate).
    #[arg(long = "platform", value_delimiter = ',')]
    pub platforms: Vec<Platform>,

    /// Output root directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Registered event handler tag (`none` to disable).
    #[arg(long)]
    pub event_handler: Option<HelperTag>,

    /// Version list format (v0, v1, v2).
    #[arg(long = "format")]
    pub format_version: Option<FormatVersion>,
}

impl BuildArgs {
    /// The request overlay these flags describe.
    pub fn request(&self) -> BuildRequest {
        BuildRequest {
            version: self.app_version.clone(),
            internal_revision: self.revision,
            platforms: (!self.platforms.is_empty()).then(|| self.platforms.clone()),
            output_dir: self.output_dir.clone(),
            event_handler: self.event_handler.clone(),
            format_version: self.format_version,
        }
    }
}

/// Execute the build subcommand.
pub fn run_build(args: &BuildArgs) -> Result<u8> {
    let env = BuildEnvironment::with_defaults().context("failed to register default helpers")?;
    let outcome = build_resources(&args.config, &args.request(), env)
        .with_context(|| format!("failed to set up build from {}", args.config.display()))?;

    for platform in &outcome.platforms {
        let status = if platform.success { "OK" } else { "FAILED" };
        println!(
            "  {:<12} {:<6} {} resources",
            platform.platform.as_str(),
            status,
            platform.resources
        );
    }
    if let Some(report) = &outcome.report_path {
        println!("Report: {}", report.display());
    }

    if outcome.success {
        println!("Build succeeded ({} platforms)", outcome.platforms.len());
        Ok(0)
    } else {
        match &outcome.error {
            Some(e) => tracing::error!(kind = e.kind().as_str(), "{e}"),
            None => tracing::error!("build failed"),
        }
        println!("Build failed at stage {}", outcome.stage);
        Ok(1)
    }
}
