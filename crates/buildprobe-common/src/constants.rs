//! System-wide constants and default paths.

use std::path::PathBuf;

/// Application name used in CLI output and log file names.
pub const APP_NAME: &str = "buildprobe";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "buildprobe";

/// Build argument that selects the release installed into the image.
pub const RELEASE_BUILD_ARG: &str = "MATLAB_RELEASE";

/// Release used by the Dockerfile when no build argument is supplied.
pub const DEFAULT_RELEASE: &str = "latest";

/// Release guaranteed not to match the fixture's recorded release.
pub const MISMATCHED_RELEASE: &str = "R2019b";

/// Directory inside the fixture tree that mocks the installation payload.
pub const INSTALL_DIR: &str = "matlab-install";

/// Version descriptor file inside [`INSTALL_DIR`].
pub const VERSION_INFO_FILE: &str = "VersionInfo.xml";

/// Trigger file inside [`INSTALL_DIR`] whose content simulates an install failure.
pub const TRIGGER_FILE: &str = "FAIL";

/// Dockerfile name expected at the root of the fixture tree.
pub const DOCKERFILE: &str = "Dockerfile";

/// Default Docker CLI binary name, resolved through `PATH`.
pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Environment variable overriding the Docker binary.
pub const ENV_DOCKER: &str = "BUILDPROBE_DOCKER";

/// Environment variable overriding the fixture directory.
pub const ENV_FIXTURE: &str = "BUILDPROBE_FIXTURE";

/// Environment variable enabling build-log persistence into a directory.
pub const ENV_LOG_DIR: &str = "BUILDPROBE_LOG_DIR";

/// Repository prefix used when tagging images built by a probe.
pub const IMAGE_TAG_PREFIX: &str = "buildprobe";

/// Returns the default fixture directory, relative to the working directory.
#[must_use]
pub fn default_fixture_dir() -> PathBuf {
    PathBuf::from("alternates").join("matlab-installer")
}

/// Returns the expected failure message for a release mismatch.
#[must_use]
pub fn release_mismatch_message(provided: &str, found: &str) -> String {
    format!(
        "Provided release ({provided}) does not match release found in {VERSION_INFO_FILE} ({found})"
    )
}
