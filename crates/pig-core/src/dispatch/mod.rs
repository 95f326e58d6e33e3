//! Command dispatch: command name → cached artifact → entry file → child.

pub mod command;
pub mod runner;

pub use command::{lookup, validate_args, CommandSpec, Invocation, COMMANDS, INIT};
pub use runner::{ensure_supported, parse_runtime_version, NodeRunner, Runner, DEFAULT_RUNTIME};

use crate::config::Config;
use crate::paths;
use crate::pkg::{root_file, ArtifactCache, ArtifactRef, Installer, PkgError, VersionSource, LATEST};
use pig_proto::ExecRequest;
use pig_util::path::format_path_buf;
use tracing::{debug, info};

/// Drives one invocation through the cache, entry resolution and a runner.
pub struct Dispatcher<'a> {
    config: &'a Config,
    source: &'a dyn VersionSource,
    installer: &'a dyn Installer,
    runner: &'a dyn Runner,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(
        config: &'a Config,
        source: &'a dyn VersionSource,
        installer: &'a dyn Installer,
        runner: &'a dyn Runner,
    ) -> Self {
        Self {
            config,
            source,
            installer,
            runner,
        }
    }

    /// Run `invocation` and return the delegated command's exit code.
    ///
    /// # Errors
    /// Returns `INVALID_OPTIONS` for unknown or malformed invocations, the
    /// cache's resolution/install errors, `ENTRY_FILE_MISSING` when the
    /// artifact declares no entry (nothing is spawned), or the runner's error.
    pub async fn dispatch(&self, invocation: Invocation) -> Result<i32, PkgError> {
        let spec = lookup(&invocation.command)?;
        (spec.validate)(&invocation)?;
        let invocation = (spec.normalize)(invocation);

        let artifact = self.prepare_artifact(spec).await?;
        let location = artifact.install_location()?;
        let entry = root_file(&location).ok_or_else(|| PkgError::entry_file_missing(&location))?;
        debug!(entry = %entry.display(), "Resolved entry file");

        let request = ExecRequest::new(
            format_path_buf(&entry),
            format_path_buf(&self.config.cwd),
            &invocation.args,
        );
        let code = self.runner.run(&request).await?;
        debug!(command = spec.name, code, "Delegated command finished");
        Ok(code)
    }

    /// Build the artifact ref and, for managed artifacts, bring the cache up to date.
    async fn prepare_artifact(&self, spec: &CommandSpec) -> Result<ArtifactRef, PkgError> {
        if let Some(target_path) = &self.config.target_path {
            debug!(target_path = %target_path.display(), "Using local artifact");
            return ArtifactRef::new(spec.artifact, LATEST, target_path, None);
        }

        let target_path = self.config.dependencies_dir();
        let store_dir = paths::store_dir(&target_path);
        debug!(
            target_path = %target_path.display(),
            store_dir = %store_dir.display(),
            "Using managed artifact"
        );
        let mut artifact = ArtifactRef::new(spec.artifact, LATEST, target_path, Some(store_dir))?;

        let cache = ArtifactCache::new(self.source, self.installer, self.config.registry.as_str());
        if cache.exists(&mut artifact).await? {
            cache.update(&mut artifact).await?;
        } else {
            cache.install(&mut artifact).await?;
        }
        info!(name = %artifact.name, version = %artifact.version, "Artifact ready");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::{codes, InstallRequest};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct StaticVersions(Vec<&'static str>);

    #[async_trait]
    impl VersionSource for StaticVersions {
        async fn list_versions(&self, _name: &str) -> Result<Vec<String>, PkgError> {
            Ok(self.0.iter().map(|v| (*v).to_string()).collect())
        }
    }

    /// Writes a package with the given manifest into the cache entry.
    struct ManifestInstaller {
        manifest: &'static str,
        installed: Mutex<Vec<String>>,
    }

    impl ManifestInstaller {
        fn new(manifest: &'static str) -> Self {
            Self {
                manifest,
                installed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Installer for ManifestInstaller {
        async fn install(&self, request: &InstallRequest) -> Result<(), PkgError> {
            fs::create_dir_all(&request.cache_dir)?;
            fs::write(request.cache_dir.join("package.json"), self.manifest)?;
            self.installed
                .lock()
                .unwrap()
                .push(format!("{}@{}", request.name, request.version));
            Ok(())
        }
    }

    /// Records requests instead of spawning; returns a fixed exit code.
    struct RecordingRunner {
        code: i32,
        requests: Mutex<Vec<ExecRequest>>,
    }

    impl RecordingRunner {
        fn exiting(code: i32) -> Self {
            Self {
                code,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Runner for RecordingRunner {
        async fn run(&self, request: &ExecRequest) -> Result<i32, PkgError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.code)
        }
    }

    fn config(home: &Path, target_path: Option<PathBuf>) -> Config {
        Config::from_lookup(home.to_path_buf(), home, |_| None)
            .with_target_path(target_path)
            .with_registry("http://registry.test/")
    }

    fn init_invocation() -> Invocation {
        let mut globals = Map::new();
        globals.insert("debug".into(), json!(true));
        Invocation::init(Some("demo"), false, globals)
    }

    #[tokio::test]
    async fn test_init_installs_resolves_and_spawns() {
        let home = tempdir().unwrap();
        let config = config(home.path(), None);
        let source = StaticVersions(vec!["1.0.0", "1.1.0"]);
        let installer = ManifestInstaller::new(r#"{"main":"lib/index.js"}"#);
        let runner = RecordingRunner::exiting(3);

        let dispatcher = Dispatcher::new(&config, &source, &installer, &runner);
        let code = dispatcher.dispatch(init_invocation()).await.unwrap();

        assert_eq!(code, 3);
        assert_eq!(
            *installer.installed.lock().unwrap(),
            vec!["@pig-cli/init@1.1.0"]
        );

        let requests = runner.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.entry.ends_with("_@pig-cli_init@1.1.0@@pig-cli/init/lib/index.js"));
        assert_eq!(request.cwd, format_path_buf(home.path()));
        assert_eq!(request.args[0], json!("demo"));
        // Back-reference stripped from the options object.
        assert_eq!(request.args[2], json!({"name": "init", "force": false}));
    }

    #[tokio::test]
    async fn test_cached_artifact_is_not_reinstalled() {
        let home = tempdir().unwrap();
        let config = config(home.path(), None);
        let source = StaticVersions(vec!["1.1.0"]);
        let installer = ManifestInstaller::new(r#"{"main":"index.js"}"#);
        let runner = RecordingRunner::exiting(0);
        let dispatcher = Dispatcher::new(&config, &source, &installer, &runner);

        dispatcher.dispatch(init_invocation()).await.unwrap();
        dispatcher.dispatch(init_invocation()).await.unwrap();

        assert_eq!(installer.installed.lock().unwrap().len(), 1);
        assert_eq!(runner.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_main_does_not_spawn() {
        let home = tempdir().unwrap();
        let config = config(home.path(), None);
        let source = StaticVersions(vec!["1.0.0"]);
        let installer = ManifestInstaller::new(r#"{"name":"@pig-cli/init"}"#);
        let runner = RecordingRunner::exiting(0);

        let dispatcher = Dispatcher::new(&config, &source, &installer, &runner);
        let err = dispatcher.dispatch(init_invocation()).await.unwrap_err();

        assert_eq!(err.code(), codes::ENTRY_FILE_MISSING);
        assert!(!err.is_terminal());
        assert!(runner.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_target_path_override_skips_cache() {
        let home = tempdir().unwrap();
        let local = home.path().join("local-init");
        fs::create_dir_all(&local).unwrap();
        fs::write(local.join("package.json"), r#"{"main":"cli.js"}"#).unwrap();

        let config = config(home.path(), Some(local.clone()));
        let source = StaticVersions(vec![]);
        let installer = ManifestInstaller::new("{}");
        let runner = RecordingRunner::exiting(0);

        let dispatcher = Dispatcher::new(&config, &source, &installer, &runner);
        assert_eq!(dispatcher.dispatch(init_invocation()).await.unwrap(), 0);

        assert!(installer.installed.lock().unwrap().is_empty());
        assert!(!config.dependencies_dir().exists());
        let requests = runner.requests.lock().unwrap();
        assert!(requests[0].entry.ends_with("local-init/cli.js"));
    }

    #[tokio::test]
    async fn test_entry_resolution_precedes_runtime_lookup() {
        let home = tempdir().unwrap();
        let local = home.path().join("local-init");
        fs::create_dir_all(&local).unwrap();
        fs::write(local.join("package.json"), r#"{"name":"@pig-cli/init"}"#).unwrap();

        let config = config(home.path(), Some(local));
        let source = StaticVersions(vec![]);
        let installer = ManifestInstaller::new("{}");
        let runner = NodeRunner::from_config(Some("pig-no-such-runtime-xyz"));

        let dispatcher = Dispatcher::new(&config, &source, &installer, &runner);
        let err = dispatcher.dispatch(init_invocation()).await.unwrap_err();
        assert_eq!(err.code(), codes::ENTRY_FILE_MISSING);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let home = tempdir().unwrap();
        let config = config(home.path(), None);
        let source = StaticVersions(vec!["1.0.0"]);
        let installer = ManifestInstaller::new("{}");
        let runner = RecordingRunner::exiting(0);

        let dispatcher = Dispatcher::new(&config, &source, &installer, &runner);
        let invocation = Invocation::new("publish", vec![Value::Object(Map::new())]);
        let err = dispatcher.dispatch(invocation).await.unwrap_err();
        assert_eq!(err.code(), codes::INVALID_OPTIONS);
    }

    #[tokio::test]
    async fn test_unpublished_artifact() {
        let home = tempdir().unwrap();
        let config = config(home.path(), None);
        let source = StaticVersions(vec![]);
        let installer = ManifestInstaller::new("{}");
        let runner = RecordingRunner::exiting(0);

        let dispatcher = Dispatcher::new(&config, &source, &installer, &runner);
        let err = dispatcher.dispatch(init_invocation()).await.unwrap_err();
        assert_eq!(err.code(), codes::PACKAGE_NOT_FOUND);
        assert!(runner.requests.lock().unwrap().is_empty());
    }
}
