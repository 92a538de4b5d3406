//! JSON report
//!
//! Written once, after every measurement of the run has finished. Durations
//! are integer nanoseconds.

use crate::config::RunConfig;
use crate::scan::ScanReport;
use crate::stats::aggregator::Report;
use crate::target::size::SizeSource;
use crate::target::Target;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Resolved target, as measured
#[derive(Debug, Clone, Serialize)]
pub struct JsonTarget {
    pub path: PathBuf,
    pub size: u64,
    pub size_source: SizeSource,
    pub alignment: u64,
}

impl From<&Target> for JsonTarget {
    fn from(target: &Target) -> Self {
        Self {
            path: target.path().to_path_buf(),
            size: target.size(),
            size_source: target.size_source(),
            alignment: target.alignment(),
        }
    }
}

/// Top-level JSON document
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub config: &'a RunConfig,
    pub target: JsonTarget,
    pub random_reads: &'a Report,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequential_scan: Option<&'a ScanReport>,
}

impl<'a> JsonReport<'a> {
    pub fn new(
        started_at: DateTime<Utc>,
        config: &'a RunConfig,
        target: JsonTarget,
        random_reads: &'a Report,
        sequential_scan: Option<&'a ScanReport>,
    ) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            started_at,
            config,
            target,
            random_reads,
            sequential_scan,
        }
    }

    /// Pretty-printed JSON to any writer
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self).context("failed to serialize JSON report")
    }
}

/// Write the report to `output_path`, replacing any existing file
pub fn write_json_output(output_path: &Path, report: &JsonReport<'_>) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    report.write_to(&mut writer)?;
    writer.write_all(b"\n")?;
    writer
        .flush()
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    Ok(())
}
