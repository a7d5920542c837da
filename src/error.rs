//! Error types for teamtodo
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, invalid input, no active team)
//! - 3: Not found (task id does not exist in the team collection)
//! - 4: Operation failed (storage, decoding, locking, watcher)

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the teamtodo CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Validation messages keyed by the input field they refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Main error type for teamtodo operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("No active team; run `teamtodo join <team> --name <user>` first")]
    NoActiveTeam,

    // Not found (exit code 3)
    #[error("Task not found: {0}")]
    TaskNotFound(u64),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Stored value for '{key}' is corrupt: {message}")]
    CorruptData { key: String, message: String },

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Data directory unavailable: {0}")]
    DataDirUnavailable(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::Validation(_)
            | Error::NoActiveTeam => exit_codes::USER_ERROR,

            Error::TaskNotFound(_) => exit_codes::NOT_FOUND,

            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::CorruptData { .. }
            | Error::LockFailed(_)
            | Error::Watch(_)
            | Error::DataDirUnavailable(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for machine-readable error output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Validation(fields) => {
                let map: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(field, message)| {
                        (field.to_string(), serde_json::Value::String(message.to_string()))
                    })
                    .collect();
                Some(serde_json::json!({ "fields": map }))
            }
            Error::TaskNotFound(id) => Some(serde_json::json!({ "id": id })),
            Error::CorruptData { key, message } => {
                Some(serde_json::json!({ "key": key, "message": message }))
            }
            Error::LockFailed(path) => {
                Some(serde_json::json!({ "lock": path.display().to_string() }))
            }
            Error::InvalidConfig(message) => Some(serde_json::json!({ "message": message })),
            _ => None,
        }
    }

    /// Shorthand for a single-field validation error.
    pub fn field(field: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field, message);
        Error::Validation(fields)
    }
}

/// Result type alias for teamtodo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
