//! Core shared types and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{SharedError, SharedResult};

/// Unique identifier for a single harness run
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> SharedResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| SharedError::InvalidUuid { input: s.to_string() })
    }

    /// Short form embedded in workspace directory names
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Participant in a harness run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// The harness itself
    Tester,
    /// Secrets server under test
    Server,
    /// Filesystem client mounting server-backed secrets
    Client,
    /// One-shot external command (build, database reset, fixture loader, unmount)
    Collaborator,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Tester => write!(f, "tester"),
            Component::Server => write!(f, "server"),
            Component::Client => write!(f, "client"),
            Component::Collaborator => write!(f, "collaborator"),
        }
    }
}

impl std::str::FromStr for Component {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tester" => Ok(Component::Tester),
            "server" => Ok(Component::Server),
            "client" => Ok(Component::Client),
            "collaborator" => Ok(Component::Collaborator),
            _ => Err(SharedError::UnknownComponent { name: s.to_string() }),
        }
    }
}

/// Lifecycle of a supervised child process.
///
/// States are ordered and only ever move forward, so a late or duplicated
/// exit notification can never drag a record back to an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    Starting,
    Running,
    Terminating,
    /// Exit status could not be determined
    Unknown,
    Reaped,
}

impl ProcessState {
    fn rank(self) -> u8 {
        match self {
            ProcessState::Starting => 0,
            ProcessState::Running => 1,
            ProcessState::Terminating => 2,
            ProcessState::Unknown => 3,
            ProcessState::Reaped => 4,
        }
    }

    /// Whether moving to `next` would be a forward transition
    pub fn can_advance_to(self, next: ProcessState) -> bool {
        next.rank() > self.rank()
    }

    /// Move to `next` if that is forward; returns whether the state changed
    pub fn advance(&mut self, next: ProcessState) -> bool {
        if self.can_advance_to(next) {
            *self = next;
            true
        } else {
            false
        }
    }

    pub fn is_reaped(self) -> bool {
        self == ProcessState::Reaped
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Terminating => "terminating",
            ProcessState::Unknown => "unknown",
            ProcessState::Reaped => "reaped",
        };
        write!(f, "{name}")
    }
}
