//! `pig init`: delegates to the `@pig-cli/init` artifact.

use pig_core::dispatch::{Dispatcher, Invocation, NodeRunner};
use pig_core::pkg::{PkgError, RegistryClient, TarballInstaller};
use pig_core::Config;
use serde_json::{Map, Value};
use tracing::debug;

/// Run `init` and return the delegated command's exit code.
pub async fn run(
    config: &Config,
    project_name: Option<&str>,
    force: bool,
    globals: Map<String, Value>,
) -> Result<i32, PkgError> {
    let registry = RegistryClient::new(&config.registry)?;
    let installer = TarballInstaller::new(registry.clone());
    let runner = NodeRunner::from_config(config.runtime.as_deref());

    debug!(
        project = project_name.unwrap_or_default(),
        force,
        home = %config.home.display(),
        "Dispatching init"
    );

    let dispatcher = Dispatcher::new(config, &registry, &installer, &runner);
    dispatcher
        .dispatch(Invocation::init(project_name, force, globals))
        .await
}
