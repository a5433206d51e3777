//! Captured build log persistence.
//!
//! Logs are stored as JSON lines, one [`BuildLogEntry`] per line, under
//! `<dir>/<name>.jsonl`.

use std::io::Write;
use std::path::{Path, PathBuf};

use buildprobe_common::error::{ProbeError, Result};
use buildprobe_common::types::{BuildLog, BuildLogEntry};

/// Returns the log file path for a named build.
///
/// Characters other than ASCII alphanumerics, `-` and `_` are replaced by `-`.
#[must_use]
pub fn log_path(dir: &Path, name: &str) -> PathBuf {
    let file: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    dir.join(format!("{file}.jsonl"))
}

/// Writes a build log, replacing any previous log with the same name.
///
/// Creates the directory if it does not exist.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or written.
pub fn save_build_log(dir: &Path, name: &str, log: &BuildLog) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| ProbeError::io(dir, e))?;
    let path = log_path(dir, name);
    let mut file = std::fs::File::create(&path).map_err(|e| ProbeError::io(&path, e))?;
    for entry in log {
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{line}").map_err(|e| ProbeError::io(&path, e))?;
    }
    tracing::info!(path = %path.display(), entries = log.len(), "saved build log");
    Ok(path)
}

/// Reads a build log back.
///
/// Returns an empty log if none was saved under `name`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_build_log(dir: &Path, name: &str) -> Result<BuildLog> {
    let path = log_path(dir, name);
    if !path.exists() {
        return Ok(BuildLog::new());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| ProbeError::io(&path, e))?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str::<BuildLogEntry>(l).map_err(ProbeError::from))
        .collect()
}
