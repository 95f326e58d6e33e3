#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pig_core::pkg::PkgError;
use pig_core::version::VERSION;
use pig_core::Config;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{debug, error};

/// Exit code for resolution, cache and configuration failures.
const EXIT_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "pig")]
#[command(author, version, about = "Runs commands from registry-published artifacts", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Enable debug logging (same as -v)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Run commands from a local artifact instead of the cache
    #[arg(short = 't', long, global = true, value_name = "PATH", env = "CLI_TARGET_PATH")]
    target_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Initialize a new project
    Init {
        /// Project name
        project_name: Option<String>,

        /// Initialize even if the target directory is not empty
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    fn verbosity(&self) -> u8 {
        self.verbose.max(u8::from(self.debug))
    }

    /// Global flags as seen by the delegated command's `parent` options.
    fn globals(&self) -> Map<String, Value> {
        let mut globals = Map::new();
        globals.insert("debug".into(), json!(self.debug));
        globals.insert("verbose".into(), json!(self.verbose));
        globals.insert(
            "targetPath".into(),
            self.target_path
                .as_ref()
                .map_or(Value::Null, |p| json!(p.to_string_lossy())),
        );
        globals
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbosity(), cli.json);

    let (project_name, force) = match &cli.command {
        Commands::Version => return commands::version::run(),
        Commands::Init {
            project_name,
            force,
        } => (project_name.clone(), *force),
    };

    debug!(version = VERSION, "Starting pig");
    let mut config = Config::from_env().into_diagnostic()?;
    if let Some(cwd) = cli.cwd.clone() {
        config = config.with_cwd(cwd);
    }
    let config = config
        .with_target_path(cli.target_path.clone())
        .with_verbosity(cli.verbosity())
        .with_json_logs(cli.json);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    let outcome = rt.block_on(async {
        commands::update_check::run(&config).await;
        commands::init::run(&config, project_name.as_deref(), force, cli.globals()).await
    });

    let code = exit_code(outcome)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Map a dispatch outcome to the process exit code.
///
/// Failures before the child started are logged and exit with
/// [`EXIT_ERROR`]; failures to start the child surface as the error itself.
fn exit_code(outcome: std::result::Result<i32, PkgError>) -> Result<i32> {
    match outcome {
        Ok(0) => Ok(0),
        Ok(code) => {
            debug!("{}", PkgError::child_non_zero_exit(code));
            Ok(code)
        }
        Err(e) if e.is_terminal() => Err(miette::miette!("{e}")),
        Err(e) => {
            error!(code = e.code(), "{}", e.message());
            Ok(EXIT_ERROR)
        }
    }
}
