//! # Build Log and Report
//!
//! [`BuildLog`] captures every orchestrator message with its platform and
//! mirrors it to `tracing`. At the end of a build it is rendered into
//! `BuildLog.txt`, and [`BuildReport`] is serialized with `quick-xml` into
//! `BuildReport.xml`:
//!
//! ```text
//! <BuildReport ApplicableVersion=".." InternalRevision=".." Success=".." ..>
//!   <Settings FormatVersion=".." OutputDirectory=".." .. />
//!   <Platform Name="Android" Success="true" ResourceCount="12">
//!     <UpdatableVersionList Length=".." Hash=".." CompressedLength=".." CompressedHash=".." />
//!     <Entry Time=".." Level="Info">message</Entry>
//!   </Platform>
//!   <Error Kind="CapacityError">message</Error>
//! </BuildReport>
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use rescat_core::{ContentHash, Platform};
use serde::Serialize;

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::layout::OutputLayout;
use crate::registry::NONE_TAG;

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    /// Progress.
    Info,
    /// Recoverable problem.
    Warning,
    /// Failure.
    Error,
}

impl LogLevel {
    /// Name used in the log file and report.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

/// One captured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// When the message was logged.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Platform being built, if any.
    pub platform: Option<Platform>,
    /// The message.
    pub message: String,
}

/// Messages of one build invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildLog {
    entries: Vec<LogEntry>,
    platform: Option<Platform>,
}

impl BuildLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute subsequent messages to a platform, or to none.
    pub fn set_platform(&mut self, platform: Option<Platform>) {
        self.platform = platform;
    }

    /// Log at info level.
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    /// Log at warning level.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warning, message.into());
    }

    /// Log at error level.
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    fn push(&mut self, level: LogLevel, message: String) {
        let platform = self.platform.map(|p| p.as_str()).unwrap_or("-");
        match level {
            LogLevel::Info => tracing::info!(platform, "{message}"),
            LogLevel::Warning => tracing::warn!(platform, "{message}"),
            LogLevel::Error => tracing::error!(platform, "{message}"),
        }
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            level,
            platform: self.platform,
            message,
        });
    }

    /// All entries in order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries attributed to one platform.
    pub fn for_platform(&self, platform: Platform) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(move |e| e.platform == Some(platform))
    }

    /// Platforms that logged at least one message.
    pub fn platforms(&self) -> BTreeSet<Platform> {
        self.entries.iter().filter_map(|e| e.platform).collect()
    }

    /// Whether any error was logged.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.level == LogLevel::Error)
    }

    /// Plain-text rendering for `BuildLog.txt`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!(
                "[{}] [{}] [{}] {}\n",
                entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                entry.level.as_str(),
                entry.platform.map(|p| p.as_str()).unwrap_or("-"),
                entry.message
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Metadata of a written Updatable list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatableListInfo {
    /// File length.
    #[serde(rename = "@Length")]
    pub length: u64,
    /// File hash.
    #[serde(rename = "@Hash")]
    pub hash: String,
    /// Compressed file length.
    #[serde(rename = "@CompressedLength")]
    pub compressed_length: u64,
    /// Compressed file hash.
    #[serde(rename = "@CompressedHash")]
    pub compressed_hash: String,
}

impl UpdatableListInfo {
    /// Describe a list from its plain and compressed bytes.
    pub fn new(plain: &[u8], compressed: &[u8]) -> Self {
        Self {
            length: plain.len() as u64,
            hash: ContentHash::of(plain).to_hex(),
            compressed_length: compressed.len() as u64,
            compressed_hash: ContentHash::of(compressed).to_hex(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ReportEntry {
    #[serde(rename = "@Time")]
    time: String,
    #[serde(rename = "@Level")]
    level: &'static str,
    #[serde(rename = "$text")]
    message: String,
}

/// Outcome of one platform.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformReport {
    #[serde(rename = "@Name")]
    name: &'static str,
    #[serde(rename = "@Success")]
    success: bool,
    #[serde(rename = "@ResourceCount")]
    resource_count: usize,
    #[serde(rename = "UpdatableVersionList", skip_serializing_if = "Option::is_none")]
    updatable: Option<UpdatableListInfo>,
    #[serde(rename = "Entry")]
    entries: Vec<ReportEntry>,
    #[serde(skip)]
    platform: Option<Platform>,
}

impl PlatformReport {
    /// The platform.
    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    /// Whether the platform built.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Updatable list metadata, once written.
    pub fn updatable(&self) -> Option<&UpdatableListInfo> {
        self.updatable.as_ref()
    }

    /// Number of log entries copied into the report.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Serialize)]
struct ReportSettings {
    #[serde(rename = "@FormatVersion")]
    format_version: String,
    #[serde(rename = "@OutputDirectory")]
    output_dir: String,
    #[serde(rename = "@EventHandler")]
    event_handler: String,
    #[serde(rename = "@Compression")]
    compression: String,
    #[serde(rename = "@UseFileSystems")]
    use_file_systems: bool,
    #[serde(rename = "@OutputPackage")]
    output_package: bool,
    #[serde(rename = "@OutputFull")]
    output_full: bool,
    #[serde(rename = "@OutputPacked")]
    output_packed: bool,
    #[serde(rename = "@OutputResourcePack")]
    output_resource_pack: bool,
    #[serde(rename = "@AdditionalCompression")]
    additional_compression: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ReportError {
    #[serde(rename = "@Kind")]
    kind: &'static str,
    #[serde(rename = "$text")]
    message: String,
}

/// The `BuildReport.xml` document.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    #[serde(rename = "@ApplicableVersion")]
    applicable_version: String,
    #[serde(rename = "@InternalRevision")]
    internal_revision: u32,
    #[serde(rename = "@Success")]
    success: bool,
    #[serde(rename = "@StartedAt")]
    started_at: String,
    #[serde(rename = "@FinishedAt", skip_serializing_if = "Option::is_none")]
    finished_at: Option<String>,
    #[serde(rename = "Settings")]
    settings: ReportSettings,
    #[serde(rename = "Platform")]
    platforms: Vec<PlatformReport>,
    #[serde(rename = "Error", skip_serializing_if = "Option::is_none")]
    error: Option<ReportError>,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl BuildReport {
    /// Start a report for a configuration. `compression` names the helper
    /// actually applied to payloads, if any.
    pub fn new(config: &BuildConfig, compression: Option<&str>) -> Self {
        Self {
            applicable_version: config.applicable_version.clone(),
            internal_revision: config.internal_revision,
            success: false,
            started_at: timestamp(Utc::now()),
            finished_at: None,
            settings: ReportSettings {
                format_version: config.format_version.to_string(),
                output_dir: config.output_dir.display().to_string(),
                event_handler: config.event_handler.to_string(),
                compression: compression.unwrap_or(NONE_TAG).to_string(),
                use_file_systems: config.use_file_systems,
                output_package: config.output_package,
                output_full: config.output_full,
                output_packed: config.output_packed,
                output_resource_pack: config.output_resource_pack,
                additional_compression: config.additional_compression,
            },
            platforms: Vec::new(),
            error: None,
        }
    }

    fn platform_mut(&mut self, platform: Platform) -> &mut PlatformReport {
        let at = match self
            .platforms
            .iter()
            .position(|p| p.platform == Some(platform))
        {
            Some(at) => at,
            None => {
                self.platforms.push(PlatformReport {
                    name: platform.as_str(),
                    success: false,
                    resource_count: 0,
                    updatable: None,
                    entries: Vec::new(),
                    platform: Some(platform),
                });
                self.platforms.len() - 1
            }
        };
        &mut self.platforms[at]
    }

    /// Record that a platform was attempted.
    pub fn begin_platform(&mut self, platform: Platform, resource_count: usize) {
        self.platform_mut(platform).resource_count = resource_count;
    }

    /// Record a platform outcome.
    pub fn end_platform(&mut self, platform: Platform, success: bool) {
        self.platform_mut(platform).success = success;
    }

    /// Record the Updatable list written for a platform.
    pub fn set_updatable(&mut self, platform: Platform, info: UpdatableListInfo) {
        self.platform_mut(platform).updatable = Some(info);
    }

    /// Record the error that ended the build.
    pub fn set_error(&mut self, error: &BuildError) {
        self.error = Some(ReportError {
            kind: error.kind().as_str(),
            message: error.to_string(),
        });
    }

    /// Close the report and copy per-platform log entries into it.
    pub fn finish(&mut self, success: bool, log: &BuildLog) {
        self.success = success;
        self.finished_at = Some(timestamp(Utc::now()));
        for report in &mut self.platforms {
            let Some(platform) = report.platform else {
                continue;
            };
            report.entries = log
                .for_platform(platform)
                .map(|e| ReportEntry {
                    time: timestamp(e.timestamp),
                    level: e.level.as_str(),
                    message: e.message.clone(),
                })
                .collect();
        }
    }

    /// Whether the build succeeded.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Platforms that were attempted, in order.
    pub fn platforms(&self) -> &[PlatformReport] {
        &self.platforms
    }

    /// Serialize to XML with a declaration.
    pub fn to_xml(&self) -> BuildResult<String> {
        let body = quick_xml::se::to_string_with_root("BuildReport", self)
            .map_err(|e| BuildError::Xml(e.to_string()))?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{body}\n"))
    }
}

/// Write `BuildReport.xml` and `BuildLog.txt`; returns the report path.
pub fn write_report(
    layout: &OutputLayout,
    report: &BuildReport,
    log: &BuildLog,
) -> BuildResult<PathBuf> {
    let dir = layout.report_dir();
    std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
    let report_file = layout.report_file();
    std::fs::write(&report_file, report.to_xml()?)
        .map_err(|e| BuildError::io(&report_file, e))?;
    let log_file = layout.log_file();
    std::fs::write(&log_file, log.render()).map_err(|e| BuildError::io(&log_file, e))?;
    Ok(report_file)
}
