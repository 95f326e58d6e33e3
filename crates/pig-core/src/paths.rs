use crate::error::Error;
use std::path::{Path, PathBuf};

/// Home directory name under the user home when `CLI_HOME` is unset.
pub const DEFAULT_CLI_HOME: &str = ".pig-cli";

/// Install root for managed artifacts, relative to the CLI home.
pub const DEPENDENCIES_DIR: &str = "dependencies";

/// Store directory name under an install root.
pub const STORE_DIR: &str = "node_modules";

/// Env file loaded from the user home before configuration is read.
pub const ENV_FILE: &str = ".env";

/// Stamp file recording the last self-update check.
pub const UPDATE_CHECK_STAMP: &str = "update-check";

/// The current user's home directory, which must exist.
///
/// # Errors
/// Returns `HomeNotFound` if it cannot be determined, `HomeMissing` if it is
/// not a directory.
pub fn user_home() -> Result<PathBuf, Error> {
    let home = dirs_next::home_dir().ok_or(Error::HomeNotFound)?;
    if !home.is_dir() {
        return Err(Error::HomeMissing { path: home });
    }
    Ok(home)
}

/// Resolve the CLI home from an optional `CLI_HOME` value.
///
/// Absolute values are used as-is; relative ones live under `user_home`.
#[must_use]
pub fn cli_home(user_home: &Path, configured: Option<&str>) -> PathBuf {
    match configured.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) if Path::new(value).is_absolute() => PathBuf::from(value),
        Some(value) => user_home.join(value),
        None => user_home.join(DEFAULT_CLI_HOME),
    }
}

/// Install root for managed artifacts: `{home}/dependencies`.
#[must_use]
pub fn dependencies_dir(cli_home: &Path) -> PathBuf {
    cli_home.join(DEPENDENCIES_DIR)
}

/// Store directory under an install root: `{target}/node_modules`.
#[must_use]
pub fn store_dir(target_path: &Path) -> PathBuf {
    target_path.join(STORE_DIR)
}

/// `~/.env`.
#[must_use]
pub fn env_file(user_home: &Path) -> PathBuf {
    user_home.join(ENV_FILE)
}

#[must_use]
pub fn update_check_stamp(cli_home: &Path) -> PathBuf {
    cli_home.join(UPDATE_CHECK_STAMP)
}
