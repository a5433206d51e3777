//! Fixture tree layout.
//!
//! A fixture tree is a Docker build context whose `matlab-install/`
//! directory mocks the installation payload.

use std::path::{Path, PathBuf};

use buildprobe_common::constants::{DOCKERFILE, INSTALL_DIR, TRIGGER_FILE, VERSION_INFO_FILE};
use buildprobe_common::error::{ProbeError, Result};

use crate::trigger::TriggerGuard;

/// A located fixture tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureTree {
    root: PathBuf,
}

impl FixtureTree {
    /// Opens the fixture tree rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or its install payload is missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ProbeError::NotFound {
                kind: "fixture directory",
                id: root.display().to_string(),
            });
        }
        let tree = Self { root };
        if !tree.install_dir().is_dir() {
            return Err(ProbeError::NotFound {
                kind: "install payload",
                id: tree.install_dir().display().to_string(),
            });
        }
        tracing::info!(path = %tree.root.display(), "opened fixture tree");
        Ok(tree)
    }

    /// Returns the build context root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the Dockerfile path.
    #[must_use]
    pub fn dockerfile(&self) -> PathBuf {
        self.root.join(DOCKERFILE)
    }

    /// Returns the mocked installation payload directory.
    #[must_use]
    pub fn install_dir(&self) -> PathBuf {
        self.root.join(INSTALL_DIR)
    }

    /// Returns the version descriptor path.
    #[must_use]
    pub fn version_info_path(&self) -> PathBuf {
        self.install_dir().join(VERSION_INFO_FILE)
    }

    /// Returns the trigger file path.
    #[must_use]
    pub fn trigger_path(&self) -> PathBuf {
        self.install_dir().join(TRIGGER_FILE)
    }

    /// Reads the release recorded in the version descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is missing or holds no release.
    pub fn release(&self) -> Result<String> {
        crate::version_info::read_release(&self.version_info_path())
    }

    /// Returns the trigger file content, if a nonempty trigger is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the trigger exists but cannot be read.
    pub fn trigger_message(&self) -> Result<Option<String>> {
        let path = self.trigger_path();
        match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProbeError::io(path, e)),
        }
    }

    /// Writes the trigger file and returns a guard that removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is empty or the file cannot be written.
    pub fn install_trigger(&self, message: &str) -> Result<TriggerGuard> {
        TriggerGuard::install(self.trigger_path(), message)
    }
}
