//! Minimal buildable fixture tree.
//!
//! The generated Dockerfile copies the mocked payload into the image and
//! runs an installer check that compares the release build argument with
//! `VersionInfo.xml` and honours the `FAIL` trigger file.

use std::path::Path;

use buildprobe_common::constants::{
    DEFAULT_RELEASE, DOCKERFILE, INSTALL_DIR, RELEASE_BUILD_ARG, TRIGGER_FILE, VERSION_INFO_FILE,
};
use buildprobe_common::error::{ProbeError, Result};

use crate::tree::FixtureTree;

/// Installer check script copied into the image.
pub const CHECK_SCRIPT_NAME: &str = "check-install.sh";

/// Base image of the generated Dockerfile.
pub const BASE_IMAGE: &str = "alpine:3.19";

/// Renders the fixture Dockerfile.
#[must_use]
pub fn dockerfile() -> String {
    format!(
        "ARG {RELEASE_BUILD_ARG}={DEFAULT_RELEASE}\n\
         FROM {BASE_IMAGE}\n\
         ARG {RELEASE_BUILD_ARG}\n\
         COPY {INSTALL_DIR} /tmp/{INSTALL_DIR}\n\
         COPY {CHECK_SCRIPT_NAME} /tmp/{CHECK_SCRIPT_NAME}\n\
         RUN sh /tmp/{CHECK_SCRIPT_NAME} \"${{{RELEASE_BUILD_ARG}}}\" /tmp/{INSTALL_DIR}\n"
    )
}

/// Renders the installer check script.
#[must_use]
pub fn check_script() -> String {
    format!(
        "#!/bin/sh\n\
         set -e\n\
         provided=\"$1\"\n\
         install_dir=\"$2\"\n\
         found=$(sed -n 's:.*<release>[[:space:]]*\\([^<]*[^<[:space:]]\\)[[:space:]]*</release>.*:\\1:p' \"$install_dir/{VERSION_INFO_FILE}\")\n\
         lower() {{ printf '%s' \"$1\" | tr '[:upper:]' '[:lower:]'; }}\n\
         if [ \"$(lower \"$provided\")\" != \"$(lower \"$found\")\" ]; then\n\
         \x20   echo \"Provided release ($provided) does not match release found in {VERSION_INFO_FILE} ($found)\"\n\
         \x20   exit 1\n\
         fi\n\
         if [ -s \"$install_dir/{TRIGGER_FILE}\" ]; then\n\
         \x20   cat \"$install_dir/{TRIGGER_FILE}\"\n\
         \x20   exit 1\n\
         fi\n\
         echo \"Installation of $found complete\"\n"
    )
}

/// Writes a buildable fixture tree recording `release` under `root`.
///
/// Existing files are overwritten; a stale trigger file is removed.
///
/// # Errors
///
/// Returns an error if any directory or file cannot be written.
pub fn scaffold(root: &Path, release: &str) -> Result<FixtureTree> {
    let install_dir = root.join(INSTALL_DIR);
    std::fs::create_dir_all(&install_dir).map_err(|e| ProbeError::io(&install_dir, e))?;

    write(&root.join(DOCKERFILE), &dockerfile())?;
    write(&root.join(CHECK_SCRIPT_NAME), &check_script())?;
    crate::version_info::write_release(&install_dir.join(VERSION_INFO_FILE), release)?;
    crate::trigger::remove_file(&install_dir.join(TRIGGER_FILE))?;

    tracing::info!(path = %root.display(), release, "scaffolded fixture tree");
    FixtureTree::open(root)
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| ProbeError::io(path, e))
}
