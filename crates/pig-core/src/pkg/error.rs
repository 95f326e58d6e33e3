//! Artifact resolution and dispatch error types.

use std::fmt;
use std::io;

/// Error codes, one per failure kind the dispatcher can surface.
pub mod codes {
    pub const INVALID_OPTIONS: &str = "INVALID_OPTIONS";
    pub const REGISTRY_UNAVAILABLE: &str = "REGISTRY_UNAVAILABLE";
    pub const PACKAGE_NOT_FOUND: &str = "PACKAGE_NOT_FOUND";
    pub const INSTALL_FAILED: &str = "INSTALL_FAILED";
    pub const ENTRY_FILE_MISSING: &str = "ENTRY_FILE_MISSING";
    pub const SPAWN_FAILED: &str = "SPAWN_FAILED";
    pub const CHILD_NON_ZERO_EXIT: &str = "CHILD_NON_ZERO_EXIT";
}

/// Artifact error: a stable code plus a human-readable message.
#[derive(Debug)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::new(codes::INVALID_OPTIONS, msg)
    }

    pub fn registry_unavailable(msg: impl Into<String>) -> Self {
        Self::new(codes::REGISTRY_UNAVAILABLE, msg)
    }

    #[must_use]
    pub fn package_not_found(name: &str) -> Self {
        Self::new(
            codes::PACKAGE_NOT_FOUND,
            format!("No published versions of {name}"),
        )
    }

    pub fn install_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::INSTALL_FAILED, msg)
    }

    #[must_use]
    pub fn entry_file_missing(location: &std::path::Path) -> Self {
        Self::new(
            codes::ENTRY_FILE_MISSING,
            format!(
                "No package.json with a main entry found from {}",
                location.display()
            ),
        )
    }

    pub fn spawn_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::SPAWN_FAILED, msg)
    }

    #[must_use]
    pub fn child_non_zero_exit(code: i32) -> Self {
        Self::new(
            codes::CHILD_NON_ZERO_EXIT,
            format!("Delegated command exited with code {code}"),
        )
    }

    /// Whether control had already passed to the delegated process.
    ///
    /// These errors end the hosting process instead of being reported and
    /// swallowed like resolution or cache failures.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.code, codes::SPAWN_FAILED | codes::CHILD_NON_ZERO_EXIT)
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

impl From<io::Error> for PkgError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::INSTALL_FAILED, e.to_string())
    }
}

impl From<reqwest::Error> for PkgError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::registry_unavailable(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::registry_unavailable(format!("Connection failed: {e}"))
        } else {
            Self::registry_unavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for PkgError {
    fn from(e: serde_json::Error) -> Self {
        Self::registry_unavailable(format!("Invalid JSON: {e}"))
    }
}
