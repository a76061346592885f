//! Harness error types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TesterError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("Workspace {operation} failed on {}: {source}", path.display())]
    Resource {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {total} assertions failed")]
    Assertion { failed: usize, total: usize },

    #[error("Command `{command}` exited unsuccessfully ({status})")]
    CommandFailed { command: String, status: String },

    #[error("Mount client exited before confirming the mount at {}", mount_point.display())]
    MountFailed { mount_point: PathBuf },

    #[error("Step {step} attempted before its prerequisites completed")]
    OutOfOrder { step: String },

    #[error("Configuration error: {field}: {message}")]
    Config { field: String, message: String },

    #[error("Failed to signal process {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used in run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    SpawnError,
    TimeoutError,
    ResourceError,
    AssertionFailure,
    CommandFailed,
    MountFailed,
    OutOfOrder,
    ConfigError,
    SignalError,
    IoError,
}

impl TesterError {
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        TesterError::Timeout {
            what: what.into(),
            timeout,
        }
    }

    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        TesterError::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn resource(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TesterError::Resource {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TesterError::Spawn { .. } => ErrorKind::SpawnError,
            TesterError::Timeout { .. } => ErrorKind::TimeoutError,
            TesterError::Resource { .. } => ErrorKind::ResourceError,
            TesterError::Assertion { .. } => ErrorKind::AssertionFailure,
            TesterError::CommandFailed { .. } => ErrorKind::CommandFailed,
            TesterError::MountFailed { .. } => ErrorKind::MountFailed,
            TesterError::OutOfOrder { .. } => ErrorKind::OutOfOrder,
            TesterError::Config { .. } => ErrorKind::ConfigError,
            TesterError::Signal { .. } => ErrorKind::SignalError,
            TesterError::Io(_) | TesterError::Json(_) => ErrorKind::IoError,
        }
    }
}

pub type TesterResult<T> = Result<T, TesterError>;
