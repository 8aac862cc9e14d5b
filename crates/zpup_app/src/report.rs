use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use zpup_core::BatchReport;
use zpup_engine::AtomicFileWriter;
use zpup_logging::zpup_info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedFailure {
    path: PathBuf,
    kind: String,
    message: String,
}

/// On-disk shape of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedReport {
    finished_utc: String,
    uploaded: BTreeMap<PathBuf, String>,
    failures: Vec<PersistedFailure>,
    not_attempted: Vec<PathBuf>,
}

impl PersistedReport {
    fn new(report: &BatchReport, finished: DateTime<Utc>) -> Self {
        Self {
            finished_utc: finished.to_rfc3339_opts(SecondsFormat::Secs, true),
            uploaded: report.uploaded.clone(),
            failures: report
                .failures
                .iter()
                .map(|failure| PersistedFailure {
                    path: failure.path.clone(),
                    kind: failure.kind.to_string(),
                    message: failure.message.clone(),
                })
                .collect(),
            not_attempted: report.not_attempted.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportFormat {
    Json,
    Ron,
}

impl ReportFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Ron,
        }
    }
}

fn serialize(report: &PersistedReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).context("serializing report as JSON")
        }
        ReportFormat::Ron => ron::ser::to_string_pretty(report, ron::ser::PrettyConfig::new())
            .context("serializing report as RON"),
    }
}

/// Writes `report` to `path` atomically, as JSON or RON depending on the extension.
pub fn save(path: &Path, report: &BatchReport, finished: DateTime<Utc>) -> Result<()> {
    let content = serialize(
        &PersistedReport::new(report, finished),
        ReportFormat::for_path(path),
    )?;
    AtomicFileWriter::new(path.to_path_buf())
        .write(content.as_bytes())
        .with_context(|| format!("writing report to {}", path.display()))?;
    zpup_info!("Report written to {}", path.display());
    Ok(())
}

/// Human-readable summary for stdout.
pub fn print_summary(report: &BatchReport, mut out: impl Write) -> io::Result<()> {
    if !report.uploaded.is_empty() {
        writeln!(out, "Uploaded:")?;
        for (path, url) in &report.uploaded {
            writeln!(out, "  {} -> {}", path.display(), url)?;
        }
    }
    if !report.failures.is_empty() {
        writeln!(out, "Failed:")?;
        for failure in &report.failures {
            writeln!(
                out,
                "  {} ({}): {}",
                failure.path.display(),
                failure.kind,
                failure.message
            )?;
        }
    }
    if !report.not_attempted.is_empty() {
        writeln!(out, "Not attempted:")?;
        for path in &report.not_attempted {
            writeln!(out, "  {}", path.display())?;
        }
    }
    writeln!(
        out,
        "{} uploaded, {} failed, {} not attempted",
        report.uploaded.len(),
        report.failures.len(),
        report.not_attempted.len()
    )
}

/// 0 when every file was uploaded, 1 otherwise.
pub fn exit_status(report: &BatchReport) -> u8 {
    if report.is_clean() {
        0
    } else {
        1
    }
}
