//! Static command table.
//!
//! Each known command names the artifact that implements it plus two plain
//! functions the dispatcher applies before execution: `validate` rejects
//! malformed invocations, `normalize` rewrites the argument list into the
//! shape the artifact's export is called with.

use crate::pkg::PkgError;
use serde_json::{json, Map, Value};

/// A resolved command intent handed over by the CLI.
///
/// `args` is ordered; its last element is the command-options object.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<Value>,
}

impl Invocation {
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// `init [projectName] [--force]` with the global flags as `parent`.
    ///
    /// Produces `[projectName|null, {force}, {name: "init", force, parent: globals}]`.
    #[must_use]
    pub fn init(project_name: Option<&str>, force: bool, globals: Map<String, Value>) -> Self {
        let project = project_name.map_or(Value::Null, |n| Value::String(n.to_string()));
        Self::new(
            INIT,
            vec![
                project,
                json!({ "force": force }),
                json!({ "name": INIT, "force": force, "parent": Value::Object(globals) }),
            ],
        )
    }

    /// The trailing command-options object, if the invocation has one.
    #[must_use]
    pub fn options(&self) -> Option<&Map<String, Value>> {
        self.args.last().and_then(Value::as_object)
    }
}

/// One row of the command table.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    /// Registry name of the artifact implementing the command.
    pub artifact: &'static str,
    pub validate: fn(&Invocation) -> Result<(), PkgError>,
    pub normalize: fn(Invocation) -> Invocation,
}

pub const INIT: &str = "init";

/// All commands the dispatcher knows.
pub const COMMANDS: &[CommandSpec] = &[CommandSpec {
    name: INIT,
    artifact: "@pig-cli/init",
    validate: validate_init,
    normalize: normalize_init,
}];

/// Find the table row for `name`.
///
/// # Errors
/// Returns `INVALID_OPTIONS` for unknown commands.
pub fn lookup(name: &str) -> Result<&'static CommandSpec, PkgError> {
    COMMANDS
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| PkgError::invalid_options(format!("Unknown command: {name}")))
}

/// Checks shared by every command: a non-empty list ending in an options object.
///
/// # Errors
/// Returns `INVALID_OPTIONS` when the shape is wrong.
pub fn validate_args(invocation: &Invocation) -> Result<(), PkgError> {
    if invocation.args.is_empty() {
        return Err(PkgError::invalid_options(format!(
            "Command {} was given no arguments",
            invocation.command
        )));
    }
    if invocation.options().is_none() {
        return Err(PkgError::invalid_options(format!(
            "Last argument of {} must be the command-options object",
            invocation.command
        )));
    }
    Ok(())
}

fn validate_init(invocation: &Invocation) -> Result<(), PkgError> {
    validate_args(invocation)?;
    let positional = &invocation.args[..invocation.args.len() - 1];
    match positional.first() {
        None | Some(Value::Null | Value::String(_)) => {}
        Some(other) => {
            return Err(PkgError::invalid_options(format!(
                "Project name must be a string, got {other}"
            )))
        }
    }
    if let Some(force) = invocation.options().and_then(|o| o.get("force")) {
        if !force.is_boolean() {
            return Err(PkgError::invalid_options("Option --force must be a boolean"));
        }
    }
    Ok(())
}

fn normalize_init(invocation: Invocation) -> Invocation {
    let Invocation { command, mut args } = invocation;
    let mut options = match args.pop() {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let force = options
        .get("force")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    options.insert("name".to_string(), Value::String(INIT.to_string()));
    options.insert("force".to_string(), Value::Bool(force));

    let project = args.into_iter().next().unwrap_or(Value::Null);
    Invocation {
        command,
        args: vec![project, json!({ "force": force }), Value::Object(options)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::codes;

    #[test]
    fn test_lookup_init() {
        let spec = lookup("init").unwrap();
        assert_eq!(spec.artifact, "@pig-cli/init");
    }

    #[test]
    fn test_lookup_unknown() {
        let err = lookup("publish").unwrap_err();
        assert_eq!(err.code(), codes::INVALID_OPTIONS);
    }

    #[test]
    fn test_init_invocation_shape() {
        let mut globals = Map::new();
        globals.insert("targetPath".into(), json!("/src/init"));
        let invocation = Invocation::init(Some("demo"), true, globals);

        assert_eq!(invocation.command, "init");
        assert_eq!(
            invocation.args,
            vec![
                json!("demo"),
                json!({"force": true}),
                json!({"name": "init", "force": true, "parent": {"targetPath": "/src/init"}}),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_empty_and_missing_options() {
        let spec = lookup("init").unwrap();
        assert!((spec.validate)(&Invocation::new("init", vec![])).is_err());
        assert!((spec.validate)(&Invocation::new("init", vec![json!("demo")])).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_project_name() {
        let spec = lookup("init").unwrap();
        let invocation = Invocation::new("init", vec![json!(42), json!({})]);
        let err = (spec.validate)(&invocation).unwrap_err();
        assert_eq!(err.code(), codes::INVALID_OPTIONS);
    }

    #[test]
    fn test_validate_rejects_non_bool_force() {
        let spec = lookup("init").unwrap();
        let invocation = Invocation::new("init", vec![json!({"force": "yes"})]);
        assert!((spec.validate)(&invocation).is_err());
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let spec = lookup("init").unwrap();
        let invocation = Invocation::new("init", vec![json!({"_trace": 1})]);
        (spec.validate)(&invocation).unwrap();

        let normalized = (spec.normalize)(invocation);
        assert_eq!(
            normalized.args,
            vec![
                Value::Null,
                json!({"force": false}),
                json!({"_trace": 1, "name": "init", "force": false}),
            ]
        );
    }

    #[test]
    fn test_normalize_is_stable_for_built_invocations() {
        let spec = lookup("init").unwrap();
        let built = Invocation::init(Some("demo"), false, Map::new());
        assert_eq!((spec.normalize)(built.clone()), built);
    }
}
