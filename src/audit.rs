//! Audit trail of profile fetches.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::directory::{ReturnCode, SearchMode};

const FILE_PREFIX: &str = "adproxy.log";

/// One fetch attempt. Never carries the password.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent<'a> {
    pub timestamp: DateTime<Utc>,
    pub login: &'a str,
    pub mode: SearchMode,
    pub target: &'a str,
    pub code: ReturnCode,
    pub message: &'a str,
}

/// Port for audit records.
///
/// Implementations must not fail the caller: errors are logged and
/// dropped.
pub trait AuditPort: Send + Sync {
    fn record(&self, event: &AuditEvent<'_>);
}

/// Audit as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingAudit;

impl AuditPort for TracingAudit {
    fn record(&self, event: &AuditEvent<'_>) {
        tracing::info!(
            login = event.login,
            mode = ?event.mode,
            target = event.target,
            code = %event.code,
            message = event.message,
            "profile fetched"
        );
    }
}

/// Audit appended as JSON lines to a daily file.
#[derive(Debug, Clone)]
pub struct FileAudit {
    directory: PathBuf,
}

impl FileAudit {
    /// Create a new [`FileAudit`] writing below `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// File receiving events of `date`, e.g. `adproxy.log.20141009`.
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.directory
            .join(format!("{FILE_PREFIX}.{}", date.format("%Y%m%d")))
    }

    fn append(&self, path: &Path, event: &AuditEvent<'_>) -> std::io::Result<()> {
        fs::create_dir_all(&self.directory)?;
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?
            .write_all(&line)
    }
}

impl AuditPort for FileAudit {
    fn record(&self, event: &AuditEvent<'_>) {
        let path = self.file_for(event.timestamp.date_naive());
        if let Err(err) = self.append(&path, event) {
            tracing::warn!(error = %err, path = %path.display(), "cannot write audit record");
        }
    }
}
