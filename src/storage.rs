use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{EtlError, Result};

/// Exclusive handle on the SQLite database for the length of a run.
///
/// Dropping the handle closes the connection, so every exit path releases it;
/// [`Storage::close`] does the same but reports a failed close.
pub struct Storage {
    conn: Option<Connection>,
    path: PathBuf,
}

impl Storage {
    pub fn open(db_path: &Path) -> Result<Self> {
        let open_error = |reason: String| EtlError::StorageOpen {
            path: db_path.to_path_buf(),
            reason,
        };
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| open_error(e.to_string()))?;
            }
        }
        let conn = Connection::open(db_path).map_err(|e| open_error(e.to_string()))?;
        info!("Opened SQLite database at {}", db_path.display());
        Ok(Self {
            conn: Some(conn),
            path: db_path.to_path_buf(),
        })
    }

    pub fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| EtlError::Config("storage connection already closed".into()))
    }

    pub fn connection_mut(&mut self) -> Result<&mut Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| EtlError::Config("storage connection already closed".into()))
    }

    pub fn close(mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| EtlError::Storage(e))?;
            debug!("Closed SQLite database at {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!("Failed to close SQLite database at {}: {}", self.path.display(), e);
            }
        }
    }
}
