//! One-shot collaborator execution
//!
//! Each collaborator leads its own process group. If the run gives up on it
//! (run deadline, unmount deadline) the future is dropped and the whole group
//! is killed, so neither the command nor anything it forked outlives the run.

use async_trait::async_trait;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::CommandSpec;
use crate::error::{TesterError, TesterResult};
use crate::traits::{CommandOutcome, CommandRunner};
use shared::{Component, component_debug, component_info, component_warn};

/// Runs collaborators as real child processes, inheriting stdout/stderr so
/// their output lands in the run trace
pub struct RealCommandRunner;

impl RealCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for RealCommandRunner {
    async fn run(&self, command: &CommandSpec) -> TesterResult<CommandOutcome> {
        component_info!(Component::Collaborator, "▶️ {}", command);

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TesterError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let guard = GroupGuard::new(child.id(), command);
        let status = child.wait().await.map_err(|source| TesterError::Spawn {
            command: command.to_string(),
            source,
        })?;
        guard.disarm();

        component_debug!(Component::Collaborator, "`{}` finished: {}", command.program, status);

        Ok(CommandOutcome {
            success: status.success(),
            code: status.code(),
            status: status.to_string(),
        })
    }
}

/// Kills a collaborator's process group when dropped before it finished
struct GroupGuard {
    pgid: Option<Pid>,
    command: String,
}

impl GroupGuard {
    fn new(pid: Option<u32>, command: &CommandSpec) -> Self {
        Self {
            pgid: pid.map(|pid| Pid::from_raw(pid as i32)),
            command: command.program.clone(),
        }
    }

    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            component_warn!(Component::Collaborator, "🛑 Abandoning `{}`, killing group {}", self.command, pgid);
            // ESRCH just means the group already emptied
            let _ = killpg(pgid, Signal::SIGKILL);
        }
    }
}
