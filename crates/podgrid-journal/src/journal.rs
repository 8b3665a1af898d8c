//! Line-oriented deploy history file.
//!
//! One JSON record per line. The file is opened and closed per write so
//! concurrent writers degrade gracefully instead of fighting over a held
//! handle. History must never abort the operation that produced a record:
//! appends swallow write failures and compaction is best-effort.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::record::DeployRecord;

/// Append-only journal of deploy records.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Journal backed by the given file. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, swallowing write failures.
    pub fn append(&self, record: &DeployRecord) {
        if let Err(e) = self.try_append(record) {
            warn!(path = %self.path.display(), error = %e, "journal append failed");
        }
    }

    /// Append one record, surfacing the write error.
    pub fn try_append(&self, record: &DeployRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record).map_err(std::io::Error::other)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Load up to `limit` records, most recent first.
    ///
    /// Malformed and blank lines are skipped, never repaired. A missing or
    /// unreadable file yields an empty history. Never mutates the log.
    pub fn load(&self, limit: usize) -> Vec<DeployRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Vec::new(),
        };

        let mut records: Vec<DeployRecord> = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => debug!(error = %e, "skipping malformed journal line"),
            }
        }
        records.reverse();
        records.truncate(limit);
        records
    }

    /// Shrink the log to its last `keep` lines once it holds more than
    /// `2 × keep`. The hysteresis avoids rewriting the file on every call.
    pub fn compact(&self, keep: usize) {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return,
        };

        let lines: Vec<&str> = contents.lines().collect();
        if lines.len() <= keep * 2 {
            return;
        }

        let mut tail = lines[lines.len() - keep..].join("\n");
        if !tail.is_empty() {
            tail.push('\n');
        }
        match fs::write(&self.path, tail) {
            Ok(()) => {
                debug!(kept = keep, dropped = lines.len() - keep, "journal compacted");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "journal compaction failed");
            }
        }
    }
}
