#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Execution request relayed from pig to a delegated artifact.
//!
//! The dispatcher never builds code at runtime. It serializes an
//! [`ExecRequest`] to JSON and passes it as the single trailing argument of a
//! fixed loader program ([`BOOTSTRAP`]) executed by the JavaScript runtime.
//!
//! ## Wire format
//! ```json
//! {"schema_version":1,"entry":"/abs/lib/index.js","cwd":"/work","args":[...]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Exec request schema version. Bump when changing [`ExecRequest`].
///
/// `bootstrap.js` carries the same number and rejects anything else.
pub const EXEC_SCHEMA_VERSION: u32 = 1;

/// Child-side loader program, passed to the runtime with `-e`.
pub const BOOTSTRAP: &str = include_str!("bootstrap.js");

/// Object keys starting with this prefix are private to the CLI and never relayed.
pub const PRIVATE_FIELD_PREFIX: char = '_';

/// Back-reference key of a command object (points at the parent command).
pub const BACK_REFERENCE_FIELD: &str = "parent";

/// Error codes for exec request validation.
pub mod codes {
    pub const EXEC_REQUEST_INVALID: &str = "EXEC_REQUEST_INVALID";
    pub const EXEC_SCHEMA_MISMATCH: &str = "EXEC_SCHEMA_MISMATCH";
}

/// Typed request handed to the delegated process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecRequest {
    pub schema_version: u32,
    /// Absolute, `/`-separated path of the artifact's entry file.
    pub entry: String,
    /// Working directory of the invoking process.
    pub cwd: String,
    /// Sanitized invocation arguments, in call order.
    pub args: Vec<Value>,
}

impl ExecRequest {
    /// Build a request at the current schema version, sanitizing `args`.
    #[must_use]
    pub fn new(entry: impl Into<String>, cwd: impl Into<String>, args: &[Value]) -> Self {
        Self {
            schema_version: EXEC_SCHEMA_VERSION,
            entry: entry.into(),
            cwd: cwd.into(),
            args: sanitize_args(args),
        }
    }

    /// Serialize to the single-argument wire form.
    ///
    /// # Errors
    /// Returns an error if an argument cannot be represented as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse and validate a request received on the wire.
    ///
    /// # Errors
    /// Returns an error if the payload is malformed or fails [`Self::validate`].
    pub fn from_json(payload: &str) -> Result<Self, ProtoError> {
        let request: Self = serde_json::from_str(payload).map_err(|e| {
            ProtoError::new(codes::EXEC_REQUEST_INVALID, format!("Invalid JSON: {e}"))
        })?;
        request.validate()?;
        Ok(request)
    }

    /// Check the invariants the child loader relies on.
    ///
    /// # Errors
    /// Returns an error on schema mismatch or an empty entry path.
    pub fn validate(&self) -> Result<(), ProtoError> {
        if self.schema_version != EXEC_SCHEMA_VERSION {
            return Err(ProtoError::new(
                codes::EXEC_SCHEMA_MISMATCH,
                format!(
                    "exec request schema {} (expected {EXEC_SCHEMA_VERSION})",
                    self.schema_version
                ),
            ));
        }
        if self.entry.trim().is_empty() {
            return Err(ProtoError::new(
                codes::EXEC_REQUEST_INVALID,
                "exec request has no entry file",
            ));
        }
        Ok(())
    }
}

/// Produce the relayable copy of an argument list.
///
/// Top-level object arguments lose every key that starts with
/// [`PRIVATE_FIELD_PREFIX`] and the [`BACK_REFERENCE_FIELD`] key. Other values
/// are copied as-is.
#[must_use]
pub fn sanitize_args(args: &[Value]) -> Vec<Value> {
    args.iter()
        .map(|arg| match arg {
            Value::Object(fields) => Value::Object(sanitize_object(fields)),
            other => other.clone(),
        })
        .collect()
}

fn sanitize_object(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(key, _)| {
            !key.starts_with(PRIVATE_FIELD_PREFIX) && key.as_str() != BACK_REFERENCE_FIELD
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Exec request error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoError {
    code: &'static str,
    message: String,
}

impl ProtoError {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProtoError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_drops_private_and_parent() {
        let args = vec![
            json!("my-app"),
            json!({"force": true}),
            json!({
                "name": "init",
                "force": true,
                "_events": {},
                "_optionValues": {"force": true},
                "parent": {"debug": true}
            }),
        ];

        let clean = sanitize_args(&args);
        assert_eq!(clean[0], json!("my-app"));
        assert_eq!(clean[1], json!({"force": true}));
        assert_eq!(clean[2], json!({"name": "init", "force": true}));
    }

    #[test]
    fn test_sanitize_keeps_non_object_values() {
        let args = vec![Value::Null, json!(3), json!(["_x", "parent"])];
        assert_eq!(sanitize_args(&args), args);
    }

    #[test]
    fn test_sanitize_is_shallow() {
        let args = vec![json!({"options": {"_keep": 1, "parent": 2}})];
        assert_eq!(sanitize_args(&args), args);
    }

    #[test]
    fn test_new_request_is_sanitized() {
        let req = ExecRequest::new("/x/index.js", "/work", &[json!({"_a": 1, "b": 2})]);
        assert_eq!(req.schema_version, EXEC_SCHEMA_VERSION);
        assert_eq!(req.args, vec![json!({"b": 2})]);
    }

    #[test]
    fn test_wire_form_parses_back() {
        let req = ExecRequest::new("/x/index.js", "/work", &[json!("demo")]);
        let payload = req.to_json().unwrap();
        assert_eq!(ExecRequest::from_json(&payload).unwrap(), req);
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let payload = r#"{"schema_version":99,"entry":"/x.js","cwd":"/","args":[]}"#;
        let err = ExecRequest::from_json(payload).unwrap_err();
        assert_eq!(err.code(), codes::EXEC_SCHEMA_MISMATCH);
    }

    #[test]
    fn test_empty_entry_rejected() {
        let payload = r#"{"schema_version":1,"entry":"  ","cwd":"/","args":[]}"#;
        let err = ExecRequest::from_json(payload).unwrap_err();
        assert_eq!(err.code(), codes::EXEC_REQUEST_INVALID);
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let err = ExecRequest::from_json(r#"{"entry": 5}"#).unwrap_err();
        assert_eq!(err.code(), codes::EXEC_REQUEST_INVALID);
    }

    #[test]
    fn test_bootstrap_matches_schema_version() {
        let marker = format!("const SCHEMA_VERSION = {EXEC_SCHEMA_VERSION};");
        assert!(BOOTSTRAP.contains(&marker));
    }

    #[test]
    fn test_bootstrap_reads_trailing_argument() {
        assert!(BOOTSTRAP.contains("process.argv[process.argv.length - 1]"));
    }
}
