//! Docker CLI build engine.
//!
//! Shells out to `docker build`. Every output line of the build becomes one
//! [`BuildLogEntry`]; a non-zero exit is the build-failure signal unless the
//! output shows the daemon could not be reached or the CLI rejected its
//! arguments.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use buildprobe_common::constants::IMAGE_TAG_PREFIX;
use buildprobe_common::error::{ProbeError, Result};
use buildprobe_common::types::{BuildLog, BuildLogEntry, BuildRequest, ImageId};

use super::{BuildEngine, BuildOptions};

const ENGINE: &str = "docker";

/// Output fragments meaning the daemon is unreachable.
const CONNECTIVITY_MARKERS: &[&str] = &[
    "Cannot connect to the Docker daemon",
    "error during connect",
    "permission denied while trying to connect to the Docker daemon",
    "Is the docker daemon running?",
];

/// Output fragments meaning the CLI rejected the invocation itself.
const USAGE_MARKERS: &[&str] = &[
    "unknown flag:",
    "invalid argument \"",
    "requires exactly 1 argument",
    "unable to prepare context",
];

/// Output fragments meaning an image is already gone.
const MISSING_IMAGE_MARKERS: &[&str] = &["No such image", "image not known"];

/// Build engine backed by the Docker CLI.
#[derive(Debug)]
pub struct DockerEngine {
    binary: PathBuf,
    scratch: Option<tempfile::TempDir>,
}

impl DockerEngine {
    /// Resolves `binary` through `PATH` and prepares a scratch directory.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::EngineUnavailable`] if the binary cannot be
    /// found, or an I/O error if the scratch directory cannot be created.
    pub fn locate(binary: &Path) -> Result<Self> {
        let resolved = which::which(binary).map_err(|e| ProbeError::EngineUnavailable {
            engine: ENGINE,
            message: format!("{}: {e}", binary.display()),
        })?;
        let scratch = tempfile::Builder::new()
            .prefix("buildprobe-")
            .tempdir()
            .map_err(|e| ProbeError::io(std::env::temp_dir(), e))?;
        tracing::info!(binary = %resolved.display(), "using docker CLI");
        Ok(Self {
            binary: resolved,
            scratch: Some(scratch),
        })
    }

    /// Returns the resolved CLI binary.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn scratch_dir(&self) -> Result<&Path> {
        self.scratch
            .as_ref()
            .map(tempfile::TempDir::path)
            .ok_or_else(|| ProbeError::EngineUnavailable {
                engine: ENGINE,
                message: "engine has been closed".into(),
            })
    }

    fn run(&self, args: &[String]) -> Result<Output> {
        tracing::debug!(binary = %self.binary.display(), ?args, "invoking docker");
        Command::new(&self.binary)
            .args(args)
            .env("BUILDKIT_PROGRESS", "plain")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ProbeError::EngineUnavailable {
                engine: ENGINE,
                message: format!("failed to run {}: {e}", self.binary.display()),
            })
    }
}

/// Assembles the `docker build` argument list.
///
/// Every image is tagged so a build whose id cannot be read back can still
/// be removed by tag.
#[must_use]
pub fn build_args(
    request: &BuildRequest,
    options: BuildOptions,
    iidfile: &Path,
    tag: &str,
) -> Vec<String> {
    let mut args = vec!["build".to_string(), "--rm".to_string()];
    if options.force_rm {
        args.push("--force-rm".to_string());
    }
    args.push("--iidfile".to_string());
    args.push(iidfile.display().to_string());
    args.push("--tag".to_string());
    args.push(tag.to_string());
    for (name, value) in request.args() {
        args.push("--build-arg".to_string());
        args.push(format!("{name}={value}"));
    }
    args.push(request.source_path().display().to_string());
    args
}

/// Turns captured output into a build log, stdout before stderr.
#[must_use]
pub fn collect_log(stdout: &str, stderr: &str) -> BuildLog {
    let mut log = BuildLog::from_output(stdout);
    for entry in BuildLog::from_output(stderr) {
        log.push(entry);
    }
    log
}

/// Returns whether `line` is build step output (`#7 ...` or `Step 2/6 : ...`).
fn is_build_step(line: &str) -> bool {
    let line = line.trim_start();
    if let Some(rest) = line.strip_prefix('#') {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        return digits > 0 && rest[digits..].starts_with(' ');
    }
    line.strip_prefix("Step ")
        .and_then(|rest| rest.split_once('/'))
        .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Classifies a failed `docker build` invocation.
///
/// Once build steps have run, connectivity markers only count on the final
/// error line, so step output quoting them stays a build failure.
#[must_use]
pub fn classify_failure(status: &str, stdout: &str, stderr: &str) -> ProbeError {
    let last_line = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or(status)
        .trim()
        .to_string();

    let build_started = stdout.lines().chain(stderr.lines()).any(is_build_step);
    let unreachable = if build_started {
        CONNECTIVITY_MARKERS.iter().any(|m| last_line.contains(m))
    } else {
        CONNECTIVITY_MARKERS.iter().any(|m| stderr.contains(m))
    };
    if unreachable {
        return ProbeError::EngineUnavailable {
            engine: ENGINE,
            message: last_line,
        };
    }
    if USAGE_MARKERS.iter().any(|m| last_line.contains(m)) {
        return ProbeError::Config {
            message: format!("docker rejected the build invocation: {last_line}"),
        };
    }

    let mut log = collect_log(stdout, stderr);
    log.push(BuildLogEntry::error(last_line.clone()));
    ProbeError::BuildFailed {
        message: format!("docker build {status}: {last_line}"),
        log,
    }
}

impl BuildEngine for DockerEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn build(&self, request: &BuildRequest, options: BuildOptions) -> Result<ImageId> {
        let build_id = uuid::Uuid::new_v4().simple().to_string();
        let iidfile = self.scratch_dir()?.join(format!("{build_id}.iid"));
        let tag = format!("{IMAGE_TAG_PREFIX}:{build_id}");
        let args = build_args(request, options, &iidfile, &tag);
        tracing::info!(
            path = %request.source_path().display(),
            args = ?request.args(),
            "docker build"
        );

        let output = self.run(&args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let err = classify_failure(&output.status.to_string(), &stdout, &stderr);
            tracing::info!(error = %err, "docker build did not produce an image");
            return Err(err);
        }

        let id = match std::fs::read_to_string(&iidfile) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(tag = %tag, error = %e, "image id unreadable; removing by tag");
                if let Err(remove_err) = self.remove_image(&ImageId::new(tag.as_str())) {
                    tracing::warn!(tag = %tag, error = %remove_err, "failed to remove tagged image");
                }
                return Err(ProbeError::io(&iidfile, e));
            }
        };
        if let Err(e) = std::fs::remove_file(&iidfile) {
            tracing::warn!(path = %iidfile.display(), error = %e, "failed to remove image id file");
        }
        let image = ImageId::new(id.trim());
        tracing::info!(image = %image, "docker build produced an image");
        Ok(image)
    }

    fn remove_image(&self, image: &ImageId) -> Result<()> {
        let args = [
            "image".to_string(),
            "rm".to_string(),
            "--force".to_string(),
            image.to_string(),
        ];
        let output = self.run(&args)?;
        if output.status.success() {
            tracing::info!(image = %image, "removed image");
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if MISSING_IMAGE_MARKERS.iter().any(|m| stderr.contains(m)) {
            tracing::debug!(image = %image, "image already removed");
            return Ok(());
        }
        Err(ProbeError::EngineUnavailable {
            engine: ENGINE,
            message: format!("failed to remove image {image}: {}", stderr.trim()),
        })
    }

    fn close(&mut self) -> Result<()> {
        if let Some(scratch) = self.scratch.take() {
            let path = scratch.path().to_path_buf();
            scratch.close().map_err(|e| ProbeError::io(path, e))?;
        }
        tracing::debug!("docker engine closed");
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.scratch.is_some()
            && Command::new(&self.binary)
                .args(["version", "--format", "{{.Server.Version}}"])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
    }
}
