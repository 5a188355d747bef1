use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// `2026-Oct-19-14:03:07`
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

pub fn format_entry(at: DateTime<Local>, message: &str) -> String {
    format!("{} : {}", at.format(TIMESTAMP_FORMAT), message)
}

/// Append-only trail of pipeline phases.
///
/// Each entry opens the file, appends one line, syncs and closes it again,
/// so an entry is on disk as soon as `log_progress` returns.
pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_progress(&self, message: &str) -> Result<()> {
        let line = format_entry(Local::now(), message);

        // A poisoned lock only means another writer panicked; the file is still usable.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.sync_all()?;

        debug!(audit = %message, "Audit entry written");
        Ok(())
    }
}
