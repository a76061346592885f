//! Trait definitions with mockall annotations for testing
//!
//! One-shot collaborators (build tools, database utilities, the fixture
//! loader, unmount) are run through [`CommandRunner`] so the orchestrator can
//! be exercised without the real toolchain installed.

use crate::config::CommandSpec;
use crate::error::TesterResult;

/// Result of running a one-shot external command to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub code: Option<i32>,
    /// Human-readable exit description ("exit status: 1", "signal: 9", ...)
    pub status: String,
}

impl CommandOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            code: Some(0),
            status: "exit status: 0".to_string(),
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
            status: format!("exit status: {code}"),
        }
    }
}

/// Runs an external command and waits for it to exit
///
/// An `Err` means the command could not be started at all; a command that
/// ran and exited non-zero is reported through [`CommandOutcome::success`].
#[mockall::automock]
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> TesterResult<CommandOutcome>;
}
