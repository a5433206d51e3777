//! Trigger file guard.
//!
//! The trigger file simulates an installation failure: the installer prints
//! its content and aborts. The guard removes it on every exit path so the
//! fixture tree is restored for the next scenario.

use std::path::{Path, PathBuf};

use buildprobe_common::error::{ProbeError, Result};

/// Removes the trigger file when dropped.
#[derive(Debug)]
pub struct TriggerGuard {
    path: PathBuf,
    message: String,
    armed: bool,
}

impl TriggerGuard {
    /// Writes `message` followed by a newline to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is blank or the file cannot be written.
    pub fn install(path: impl Into<PathBuf>, message: &str) -> Result<Self> {
        let path = path.into();
        if message.trim().is_empty() {
            return Err(ProbeError::Config {
                message: "trigger message must not be empty".into(),
            });
        }
        std::fs::write(&path, format!("{message}\n")).map_err(|e| ProbeError::io(&path, e))?;
        tracing::info!(path = %path.display(), "installed trigger file");
        Ok(Self {
            path,
            message: message.to_string(),
            armed: true,
        })
    }

    /// Returns the trigger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the message written into the trigger file.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Removes the trigger file now, reporting failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(mut self) -> Result<()> {
        self.armed = false;
        remove_file(&self.path)
    }
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = remove_file(&self.path) {
                tracing::warn!(error = %e, "failed to remove trigger file");
            }
        }
    }
}

/// Removes a file, treating an already-missing file as success.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn remove_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed trigger file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ProbeError::io(path, e)),
    }
}
