use crate::error::Error;
use crate::paths;
use crate::pkg::{DEFAULT_REGISTRY, REGISTRY_ENV};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Cache root override.
pub const CLI_HOME_ENV: &str = "CLI_HOME";

/// Local artifact override; dispatch skips the cache when set.
pub const TARGET_PATH_ENV: &str = "CLI_TARGET_PATH";

/// JavaScript runtime used for delegated commands.
pub const RUNTIME_ENV: &str = "PIG_CLI_RUNTIME";

/// Runtime configuration for the pig CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Current working directory; delegated commands run here.
    pub cwd: PathBuf,

    /// CLI home (`CLI_HOME`), holding the managed install root.
    pub home: PathBuf,

    /// Local artifact location that bypasses the cache.
    pub target_path: Option<PathBuf>,

    /// Registry base URL.
    pub registry: String,

    /// Runtime executable; `None` means `node` from `PATH`.
    pub runtime: Option<String>,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Config {
    /// Build a config from the process environment.
    ///
    /// `~/.env` is loaded first when present; variables already set in the
    /// environment take precedence over it.
    ///
    /// # Errors
    /// Returns an error if the user home is unusable or `~/.env` is malformed.
    pub fn from_env() -> Result<Self, Error> {
        let user_home = paths::user_home()?;
        load_env_file(&user_home)?;
        let cwd = std::env::current_dir()?;
        Ok(Self::from_lookup(cwd, &user_home, |key| std::env::var(key).ok()))
    }

    /// Build a config from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(cwd: PathBuf, user_home: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = paths::cli_home(user_home, lookup(CLI_HOME_ENV).as_deref());
        let target_path = non_empty(TARGET_PATH_ENV).map(|p| cwd.join(p));
        let registry = non_empty(REGISTRY_ENV).unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
        let runtime = non_empty(RUNTIME_ENV);

        debug!(home = %home.display(), registry = %registry, "Loaded configuration");

        Self {
            cwd,
            home,
            target_path,
            registry,
            runtime,
            json_logs: false,
            verbosity: 0,
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Set the working directory; a relative target path follows it.
    #[must_use]
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }

    /// Override the local artifact location, relative to `cwd`.
    #[must_use]
    pub fn with_target_path(mut self, target_path: Option<PathBuf>) -> Self {
        if let Some(path) = target_path {
            self.target_path = Some(self.cwd.join(path));
        }
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: Option<String>) -> Self {
        if runtime.is_some() {
            self.runtime = runtime;
        }
        self
    }

    /// Managed install root: `{home}/dependencies`.
    #[must_use]
    pub fn dependencies_dir(&self) -> PathBuf {
        paths::dependencies_dir(&self.home)
    }
}

/// Load `{user_home}/.env` into the process environment if it exists.
///
/// # Errors
/// Returns `EnvFile` when the file exists but cannot be parsed.
pub fn load_env_file(user_home: &Path) -> Result<bool, Error> {
    let path = paths::env_file(user_home);
    if !path.is_file() {
        return Ok(false);
    }
    dotenvy::from_path(&path).map_err(|source| Error::EnvFile {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), "Loaded env file");
    Ok(true)
}
