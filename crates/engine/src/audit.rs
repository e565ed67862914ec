//! Durable audit trail: one JSON line per run report, one file per day.
//!
//! The report files are the only externally persisted artifact besides the
//! revert store; the dashboard reads them to show operators what fired,
//! what was blocked and why, and what failed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::coordinator::RunReport;

/// Errors from audit persistence.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Appends run reports to per-day `runs-YYYY-MM-DD.jsonl` files.
pub struct ReportWriter {
    reports_dir: PathBuf,
}

impl ReportWriter {
    /// Create a writer over `reports_dir`, creating the directory if needed.
    pub fn new(reports_dir: &Path) -> Result<Self, AuditError> {
        fs::create_dir_all(reports_dir)?;
        Ok(Self {
            reports_dir: reports_dir.to_path_buf(),
        })
    }

    /// Append one report as a single JSON line; returns the file written.
    pub fn append(&self, report: &RunReport) -> Result<PathBuf, AuditError> {
        let filename = format!("runs-{}.jsonl", report.started_at.format("%Y-%m-%d"));
        let path = self.reports_dir.join(filename);

        let mut line = serde_json::to_string(report)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;

        info!(
            run_id = %report.run_id,
            rule_set_id = %report.rule_set_id,
            path = %path.display(),
            "appended run report"
        );
        Ok(path)
    }
}
