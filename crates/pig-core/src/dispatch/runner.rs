//! Execution of a resolved entry file.

use crate::pkg::PkgError;
use crate::version::LOWEST_RUNTIME_VERSION;
use async_trait::async_trait;
use pig_proto::{ExecRequest, BOOTSTRAP};
use semver::Version;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default runtime executable looked up on `PATH`.
pub const DEFAULT_RUNTIME: &str = "node";

/// Runs an [`ExecRequest`] to completion and reports its exit code.
#[async_trait]
pub trait Runner: Send + Sync {
    /// # Errors
    /// Returns `SPAWN_FAILED` when the request cannot be started.
    async fn run(&self, request: &ExecRequest) -> Result<i32, PkgError>;
}

/// Spawns the JavaScript runtime with the fixed bootstrap program.
///
/// The runtime is looked up on every [`Runner::run`], so a missing runtime
/// only fails once there is an entry file to run. The child gets inherited
/// stdio and the request's cwd; the serialized request is its only argument
/// after `--`.
#[derive(Debug, Clone)]
pub struct NodeRunner {
    runtime: PathBuf,
}

impl NodeRunner {
    /// A runner for `runtime`, either a bare name searched on `PATH` or a path.
    #[must_use]
    pub fn new(runtime: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
        }
    }

    /// A runner for the configured runtime, else `node`.
    #[must_use]
    pub fn from_config(configured: Option<&str>) -> Self {
        Self::new(configured.unwrap_or(DEFAULT_RUNTIME))
    }

    /// The runtime as configured, before lookup.
    #[must_use]
    pub fn runtime(&self) -> &Path {
        &self.runtime
    }

    /// Resolve the runtime to an executable.
    ///
    /// # Errors
    /// Returns `SPAWN_FAILED` if the executable cannot be found.
    pub fn locate(&self) -> Result<PathBuf, PkgError> {
        let runtime = which::which(&self.runtime).map_err(|e| {
            PkgError::spawn_failed(format!(
                "JavaScript runtime '{}' not found: {e}",
                self.runtime.display()
            ))
        })?;
        debug!(runtime = %runtime.display(), "Located runtime");
        Ok(runtime)
    }

    /// Ask the runtime for its version.
    ///
    /// # Errors
    /// Returns `SPAWN_FAILED` if it cannot be found, run, or prints no version.
    pub async fn runtime_version(&self) -> Result<Version, PkgError> {
        let runtime = self.locate()?;
        version_of(&runtime).await
    }

    /// Refuse runtimes older than the lowest supported version.
    ///
    /// # Errors
    /// Returns `SPAWN_FAILED` for missing, unreadable or too-old runtimes.
    pub async fn check_version(&self) -> Result<(), PkgError> {
        let version = self.runtime_version().await?;
        ensure_supported(&version)
    }
}

#[async_trait]
impl Runner for NodeRunner {
    async fn run(&self, request: &ExecRequest) -> Result<i32, PkgError> {
        let runtime = self.locate()?;
        ensure_supported(&version_of(&runtime).await?)?;

        let payload = request
            .to_json()
            .map_err(|e| PkgError::spawn_failed(format!("Failed to encode exec request: {e}")))?;

        debug!(entry = %request.entry, cwd = %request.cwd, "Spawning delegated command");
        let status = Command::new(&runtime)
            .arg("-e")
            .arg(BOOTSTRAP)
            .arg("--")
            .arg(payload)
            .current_dir(&request.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| spawn_error(&runtime, &e))?;

        Ok(status.code().unwrap_or_else(|| {
            warn!("Delegated command was terminated by a signal");
            1
        }))
    }
}

async fn version_of(runtime: &Path) -> Result<Version, PkgError> {
    let output = Command::new(runtime)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| spawn_error(runtime, &e))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_runtime_version(&stdout).ok_or_else(|| {
        PkgError::spawn_failed(format!(
            "Could not read version of {}: {:?}",
            runtime.display(),
            stdout.trim()
        ))
    })
}

fn spawn_error(runtime: &Path, e: &std::io::Error) -> PkgError {
    PkgError::spawn_failed(format!("Failed to start {}: {e}", runtime.display()))
}

/// Parse `v18.19.0`-style version output.
#[must_use]
pub fn parse_runtime_version(output: &str) -> Option<Version> {
    let line = output.lines().next()?.trim();
    Version::parse(line.strip_prefix('v').unwrap_or(line)).ok()
}

/// # Errors
/// Returns `SPAWN_FAILED` if `version` is below the lowest supported runtime.
pub fn ensure_supported(version: &Version) -> Result<(), PkgError> {
    let lowest = Version::parse(LOWEST_RUNTIME_VERSION)
        .map_err(|e| PkgError::spawn_failed(format!("Invalid lowest runtime version: {e}")))?;
    if *version < lowest {
        return Err(PkgError::spawn_failed(format!(
            "pig requires a JavaScript runtime >= {lowest}, found {version}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::codes;

    #[test]
    fn test_parse_runtime_version() {
        assert_eq!(
            parse_runtime_version("v18.19.0\n"),
            Some(Version::new(18, 19, 0))
        );
        assert_eq!(parse_runtime_version("20.1.0"), Some(Version::new(20, 1, 0)));
        assert_eq!(parse_runtime_version(""), None);
        assert_eq!(parse_runtime_version("node"), None);
    }

    #[test]
    fn test_version_gate() {
        assert!(ensure_supported(&Version::new(12, 0, 0)).is_ok());
        assert!(ensure_supported(&Version::new(20, 11, 1)).is_ok());

        let err = ensure_supported(&Version::new(10, 24, 1)).unwrap_err();
        assert_eq!(err.code(), codes::SPAWN_FAILED);
    }

    #[test]
    fn test_locate_missing_runtime() {
        // Construction never looks the runtime up.
        let runner = NodeRunner::from_config(Some("pig-no-such-runtime-xyz"));
        assert_eq!(runner.runtime(), Path::new("pig-no-such-runtime-xyz"));

        let err = runner.locate().unwrap_err();
        assert_eq!(err.code(), codes::SPAWN_FAILED);
    }

    #[test]
    fn test_default_runtime_is_node() {
        assert_eq!(NodeRunner::from_config(None).runtime(), Path::new(DEFAULT_RUNTIME));
    }

    #[tokio::test]
    async fn test_unspawnable_runtime() {
        let runner = NodeRunner::new("/nonexistent/pig-runtime");
        let request = ExecRequest::new("/tmp/index.js", "/tmp", &[]);
        let err = runner.run(&request).await.unwrap_err();
        assert_eq!(err.code(), codes::SPAWN_FAILED);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_old_runtime_is_refused() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("node");
        std::fs::write(&fake, "#!/bin/sh\necho v10.0.0\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = NodeRunner::new(&fake);
        let request = ExecRequest::new("/tmp/index.js", "/tmp", &[]);
        let err = runner.run(&request).await.unwrap_err();
        assert_eq!(err.code(), codes::SPAWN_FAILED);
        assert!(err.message().contains("12.0.0"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_exit_code_propagates() {
        use std::os::unix::fs::PermissionsExt;

        // Reports a supported version, otherwise exits with 7.
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("node");
        std::fs::write(
            &fake,
            "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo v18.0.0; exit 0; fi\nexit 7\n",
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = NodeRunner::new(&fake);
        let cwd = dir.path().to_string_lossy().into_owned();
        let request = ExecRequest::new("/tmp/index.js", cwd, &[]);
        assert_eq!(runner.run(&request).await.unwrap(), 7);
    }
}
