//! Engine checkout revision, recorded in reports.

use std::path::Path;
use std::process::Command;

/// HEAD commit of the git work tree containing `dir`, if there is one.
///
/// Runs `git rev-parse HEAD`; any failure (no git, not a repository)
/// yields `None` since the revision is informational only.
pub fn capture_head_sha(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .ok()?;

    if !output.status.success() {
        tracing::debug!(
            dir = %dir.display(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "no git revision for engine"
        );
        return None;
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

/// Revision of the checkout an engine binary was built from.
///
/// Walks up from the binary's directory; `git` resolves the enclosing
/// work tree itself.
pub fn engine_revision(engine: &Path) -> Option<String> {
    let dir = engine.parent().filter(|p| !p.as_os_str().is_empty())?;
    if !dir.is_dir() {
        return None;
    }
    capture_head_sha(dir)
}
