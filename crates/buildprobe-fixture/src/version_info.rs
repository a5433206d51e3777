//! The `VersionInfo.xml` version descriptor.
//!
//! Only the `<release>` element matters to a probe: the installer compares
//! it with the release build argument.

use std::path::Path;
use std::sync::LazyLock;

use buildprobe_common::error::{ProbeError, Result};
use regex::{NoExpand, Regex};

#[allow(clippy::expect_used)]
static RELEASE_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<release>\s*([^<]*?)\s*</release>").expect("invalid release element pattern")
});

/// Extracts the release recorded in a version descriptor.
///
/// Returns `None` when the element is missing or empty.
#[must_use]
pub fn parse_release(xml: &str) -> Option<String> {
    RELEASE_ELEMENT
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|r| !r.is_empty())
}

/// Reads the release recorded in the descriptor at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no release.
pub fn read_release(path: &Path) -> Result<String> {
    let xml = std::fs::read_to_string(path).map_err(|e| ProbeError::io(path, e))?;
    let release = parse_release(&xml).ok_or_else(|| ProbeError::NotFound {
        kind: "release element",
        id: path.display().to_string(),
    })?;
    tracing::debug!(path = %path.display(), %release, "read fixture release");
    Ok(release)
}

/// Renders a minimal descriptor recording `release`.
#[must_use]
pub fn render(release: &str) -> String {
    format!(
        "<!-- Version information for the mocked installation payload -->\n\
         <MathWorks_version_info>\n  \
         <version>0.0.0.0</version>\n  \
         <release>{release}</release>\n  \
         <description>mock</description>\n  \
         <date>Jan 01 1970</date>\n\
         </MathWorks_version_info>\n"
    )
}

/// Writes a descriptor recording `release`, replacing the file if present.
///
/// An existing descriptor keeps every element except `<release>`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written.
pub fn write_release(path: &Path, release: &str) -> Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(existing) if RELEASE_ELEMENT.is_match(&existing) => {
            let element = format!("<release>{release}</release>");
            RELEASE_ELEMENT
                .replace(&existing, NoExpand(&element))
                .into_owned()
        }
        Ok(_) => render(release),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => render(release),
        Err(e) => return Err(ProbeError::io(path, e)),
    };
    std::fs::write(path, content).map_err(|e| ProbeError::io(path, e))?;
    tracing::info!(path = %path.display(), release, "wrote fixture release");
    Ok(())
}
