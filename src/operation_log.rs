use anyhow::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Log file name
const OPERATION_LOG_FILE: &str = "operation_log.txt";

/// Append-only, human-readable record of completed operations.
#[derive(Debug, Clone)]
pub struct OperationLog {
    path: PathBuf,
}

impl OperationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log in the app data directory (same place as the settings file)
    pub fn default_location() -> Self {
        Self::new(crate::settings::app_data_dir().join(OPERATION_LOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a structured log entry describing a user-requested operation.
    pub fn append(&self, operation: &str, chain_id: u64, details: impl AsRef<str>) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let timestamp = Utc::now().to_rfc3339();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(
            file,
            "[{}] chain_id={} operation={}",
            timestamp, chain_id, operation
        )?;

        let body = details.as_ref();
        if body.trim().is_empty() {
            writeln!(file, "  (no additional details)")?;
        } else {
            for line in body.lines() {
                if line.trim().is_empty() {
                    writeln!(file)?;
                } else {
                    writeln!(file, "  {}", line)?;
                }
            }
        }

        writeln!(file)?;
        Ok(())
    }

    /// Read the entire log file content
    pub fn read(&self) -> Result<String> {
        if self.path.exists() {
            Ok(fs::read_to_string(&self.path)?)
        } else {
            Ok(String::new())
        }
    }
}
