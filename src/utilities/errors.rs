//! Error types for crew construction and execution.
//!
//! Construction errors (`ConfigError`, `CrewError::UnresolvedAgent`) surface
//! before any model call is made. Execution errors are wrapped in a
//! [`KickoffError`] carrying the index of the task that failed.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::utilities::converter::ConverterError;

/// Errors raised while reading agent or task configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested key is not present in the configuration table.
    #[error("no {table} configuration entry named '{key}'")]
    MissingEntry { table: &'static str, key: String },

    /// A required field is absent or blank.
    #[error("{table} configuration '{key}' is missing required field '{field}'")]
    MissingField {
        table: &'static str,
        key: String,
        field: &'static str,
    },

    /// A field is present but has the wrong shape.
    #[error("{table} configuration '{key}' has invalid field '{field}': {reason}")]
    InvalidField {
        table: &'static str,
        key: String,
        field: String,
        reason: String,
    },

    /// Two entries in the same crew share a name.
    #[error("duplicate {kind} name '{name}' in crew")]
    Duplicate { kind: &'static str, name: String },

    /// A crew was built without tasks.
    #[error("a crew needs at least one task")]
    NoTasks,

    /// A task's `context` names a task that does not run before it.
    #[error("task '{task}' takes context from '{reference}', which is not an earlier task")]
    InvalidContext { task: String, reference: String },

    /// A `{placeholder}` in prompt text has no matching kickoff input.
    #[error("template variable '{variable}' in '{key}' not found in inputs")]
    MissingInput { key: String, variable: String },

    /// The configuration document is not valid YAML for a table.
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transport-level failure of a model invocation.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The request could not be delivered or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered with a body that has no completion in it.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// The client was configured with a value it cannot use.
    #[error("invalid client setting: {0}")]
    InvalidSetting(String),

    /// The provider needs an API key and none was configured.
    #[error("API key not set for model '{model}'")]
    MissingApiKey { model: String },
}

impl From<reqwest::Error> for InvocationError {
    fn from(err: reqwest::Error) -> Self {
        InvocationError::Transport(err.to_string())
    }
}

/// Discriminant of [`CrewError`], convenient for matching in callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    UnresolvedAgent,
    Invocation,
    OutputSchema,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::UnresolvedAgent => "unresolved_agent",
            ErrorKind::Invocation => "invocation",
            ErrorKind::OutputSchema => "output_schema",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Errors produced while building or running a crew.
#[derive(Debug, Error)]
pub enum CrewError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A task is bound to an agent the crew does not contain.
    #[error("task '{task}' references agent '{agent}', which is not part of the crew")]
    UnresolvedAgent { task: String, agent: String },

    #[error("model invocation failed: {0}")]
    Invocation(#[from] InvocationError),

    #[error("output does not match schema: {0}")]
    OutputSchema(#[from] ConverterError),

    /// The run was cancelled before the task started.
    #[error("run cancelled")]
    Cancelled,
}

impl CrewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrewError::Config(_) => ErrorKind::Config,
            CrewError::UnresolvedAgent { .. } => ErrorKind::UnresolvedAgent,
            CrewError::Invocation(_) => ErrorKind::Invocation,
            CrewError::OutputSchema(_) => ErrorKind::OutputSchema,
            CrewError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Failure of a crew run, pinned to the task that stopped it.
///
/// No partial results travel with this error: the outputs of tasks that
/// completed before the failure are discarded along with the run.
#[derive(Debug, Error)]
#[error("task {task_index} ('{task_name}') failed: {error}")]
pub struct KickoffError {
    pub task_index: usize,
    pub task_name: String,
    #[source]
    pub error: CrewError,
}

impl KickoffError {
    pub fn new(task_index: usize, task_name: impl Into<String>, error: CrewError) -> Self {
        Self {
            task_index,
            task_name: task_name.into(),
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = CrewError::UnresolvedAgent {
            task: "evaluate_candidate".to_string(),
            agent: "ghost".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::UnresolvedAgent);
        assert_eq!(CrewError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            CrewError::from(InvocationError::Transport("reset".into())).kind(),
            ErrorKind::Invocation
        );
    }

    #[test]
    fn test_kickoff_error_display() {
        let err = KickoffError::new(
            0,
            "evaluate_candidate",
            CrewError::Invocation(InvocationError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
        );
        assert_eq!(err.kind(), ErrorKind::Invocation);
        assert_eq!(
            err.to_string(),
            "task 0 ('evaluate_candidate') failed: model invocation failed: provider returned 503: unavailable"
        );
    }
}
