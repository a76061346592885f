//! Process supervision for long-running children
//!
//! The server and the mount client each run as the leader of their own
//! process group. Termination signals the whole group so helper processes
//! spawned by a leader are reached too, and reaping waits on the group so
//! those helpers do not linger as zombies once they are re-parented to us.

use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill, killpg};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

use crate::config::CommandSpec;
use crate::error::{TesterError, TesterResult};
use shared::{Component, ProcessState, component_debug, component_info, component_warn};

/// How often the grace loop re-checks a terminating group
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extra time allowed for SIGKILL to take effect after escalation
const KILL_SETTLE: Duration = Duration::from_secs(1);

/// Supervisor-owned record of a spawned child
#[derive(Debug, Clone)]
pub struct ManagedProcess {
    pub component: Component,
    pub pid: Pid,
    pub pgid: Pid,
    /// Whether the child leads its own process group
    pub leads_group: bool,
    pub command: String,
    pub state: ProcessState,
    pub started_at: DateTime<Utc>,
    /// Exit description once reaped
    pub exit: Option<String>,
}

/// Starts, tracks, reaps and terminates supervised children.
///
/// Cloning yields another handle to the same process table, which is how the
/// SIGCHLD reaper task shares it with the orchestrator.
#[derive(Clone)]
pub struct ProcessSupervisor {
    processes: Arc<Mutex<HashMap<Pid, ManagedProcess>>>,
    force_kill: bool,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self {
            processes: Arc::new(Mutex::new(HashMap::new())),
            force_kill: false,
        }
    }

    /// Escalate to SIGKILL once a group outlives its grace period
    pub fn with_force_kill(mut self, enabled: bool) -> Self {
        self.force_kill = enabled;
        self
    }

    /// Make this process the reaper for orphaned descendants.
    ///
    /// Helpers left behind when a group leader exits are re-parented to us
    /// instead of init, so group-scoped waits can collect them.
    pub fn adopt_orphans() -> TesterResult<()> {
        #[cfg(target_os = "linux")]
        {
            nix::sys::prctl::set_child_subreaper(true).map_err(|source| TesterError::Signal {
                pid: std::process::id() as i32,
                source,
            })?;
            component_debug!(Component::Tester, "Registered as child subreaper");
        }
        Ok(())
    }

    /// Launch a child and return immediately.
    ///
    /// With `new_process_group` the child becomes the leader of a fresh
    /// group, isolating it from signals aimed at the harness's own group.
    pub async fn spawn(
        &self,
        component: Component,
        command: &CommandSpec,
        new_process_group: bool,
    ) -> TesterResult<ManagedProcess> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if new_process_group {
            cmd.process_group(0);
        }

        // The table is locked before forking so the record is inserted with no
        // await point in between; a cancelled caller cannot lose the child.
        let mut processes = self.processes.lock().await;
        let child = cmd.spawn().map_err(|source| TesterError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let pid = Pid::from_raw(child.id() as i32);
        // Exit status is collected through waitpid on the group, never through
        // the std handle, so the handle is simply released here.
        drop(child);

        let pgid = if new_process_group { pid } else { nix::unistd::getpgrp() };
        let mut record = ManagedProcess {
            component,
            pid,
            pgid,
            leads_group: new_process_group,
            command: command.to_string(),
            state: ProcessState::Starting,
            started_at: Utc::now(),
            exit: None,
        };
        record.state.advance(ProcessState::Running);

        processes.insert(pid, record.clone());
        drop(processes);

        component_info!(component, "🚀 Started `{}` with pid {} (group {})", record.command, pid, pgid);
        Ok(record)
    }

    /// Collect exit statuses of every supervised group without blocking.
    ///
    /// Safe to call at any time and any number of times: records only ever
    /// move towards `Reaped`. Returns the leaders newly reaped by this call.
    pub async fn reap(&self) -> Vec<Pid> {
        let mut processes = self.processes.lock().await;
        let mut reaped = Vec::new();

        for record in processes.values_mut() {
            if Self::collect(record) {
                reaped.push(record.pid);
            }
        }

        reaped
    }

    /// Drain exited members of one record's group; true if the leader was reaped now
    fn collect(record: &mut ManagedProcess) -> bool {
        if record.state.is_reaped() && !record.leads_group {
            return false;
        }

        let target = if record.leads_group {
            Pid::from_raw(-record.pgid.as_raw())
        } else {
            record.pid
        };

        let mut leader_reaped = false;
        loop {
            match waitpid(target, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => break,
                Ok(status) => {
                    if status.pid() == Some(record.pid) && record.state.advance(ProcessState::Reaped) {
                        record.exit = Some(describe(&status));
                        leader_reaped = true;
                        component_debug!(record.component, "Reaped pid {}: {}", record.pid, describe(&status));
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => {
                    // Nothing left to wait for: a leader stays our child until
                    // reaped, so it is gone as well.
                    if record.state.advance(ProcessState::Reaped) {
                        record.exit.get_or_insert_with(|| "exit status unavailable".to_string());
                        leader_reaped = true;
                    }
                    break;
                }
                Err(e) => {
                    record.state.advance(ProcessState::Unknown);
                    component_warn!(record.component, "⚠️ waitpid failed for pid {}: {}", record.pid, e);
                    break;
                }
            }
        }

        leader_reaped
    }

    /// Signal a supervised process's group and wait for it to go away.
    ///
    /// Sends SIGTERM to the whole group, then waits up to `grace` for the
    /// leader to be reaped and the group to empty. Outliving the grace period
    /// yields `TesterError::Timeout`, which callers treat as a teardown
    /// warning. A process already `Reaped` is never signalled again.
    pub async fn terminate(&self, pid: Pid, grace: Duration) -> TesterResult<()> {
        let (component, pgid, leads_group) = {
            let mut processes = self.processes.lock().await;
            let Some(record) = processes.get_mut(&pid) else {
                component_debug!(Component::Tester, "pid {} is not supervised; nothing to terminate", pid);
                return Ok(());
            };

            Self::collect(record);
            if record.state.is_reaped() {
                component_debug!(record.component, "pid {} already reaped; not signalling", pid);
                return Ok(());
            }

            match send_signal(record, Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(source) => {
                    return Err(TesterError::Signal {
                        pid: pid.as_raw(),
                        source,
                    });
                }
            }
            record.state.advance(ProcessState::Terminating);
            (record.component, record.pgid, record.leads_group)
        };

        component_info!(component, "🛑 Sent SIGTERM to process group {}", pgid);

        if self.wait_gone(pid, grace).await {
            component_info!(component, "✅ Process group {} exited", pgid);
            return Ok(());
        }

        component_warn!(component, "⏰ Process group {} still alive after {:?}", pgid, grace);

        if self.force_kill {
            component_warn!(component, "🔨 Escalating to SIGKILL for process group {}", pgid);
            let target = if leads_group {
                killpg(pgid, Signal::SIGKILL)
            } else {
                kill(pid, Signal::SIGKILL)
            };
            if let Err(e) = target {
                component_warn!(component, "⚠️ SIGKILL to {} failed: {}", pgid, e);
            }
            self.wait_gone(pid, KILL_SETTLE).await;
        }

        Err(TesterError::timeout(format!("process group {pgid} to exit"), grace))
    }

    /// Poll until the leader is reaped and its group is empty, or `limit` passes
    async fn wait_gone(&self, pid: Pid, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            self.reap().await;
            if let Some(record) = self.get(pid).await {
                if record.state.is_reaped() && group_is_empty(&record) {
                    return true;
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    /// Snapshot of one record
    pub async fn get(&self, pid: Pid) -> Option<ManagedProcess> {
        self.processes.lock().await.get(&pid).cloned()
    }

    /// Snapshot of every record, oldest first
    pub async fn records(&self) -> Vec<ManagedProcess> {
        let mut records: Vec<_> = self.processes.lock().await.values().cloned().collect();
        records.sort_by_key(|r| r.started_at);
        records
    }

    pub async fn state(&self, pid: Pid) -> Option<ProcessState> {
        self.processes.lock().await.get(&pid).map(|r| r.state)
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

fn send_signal(record: &ManagedProcess, signal: Signal) -> Result<(), Errno> {
    if record.leads_group {
        killpg(record.pgid, signal)
    } else {
        kill(record.pid, signal)
    }
}

/// Whether no process remains in the record's group
fn group_is_empty(record: &ManagedProcess) -> bool {
    if !record.leads_group {
        return true;
    }
    matches!(killpg(record.pgid, None), Err(Errno::ESRCH))
}

fn describe(status: &WaitStatus) -> String {
    match status {
        WaitStatus::Exited(_, code) => format!("exit status: {code}"),
        WaitStatus::Signaled(_, signal, _) => format!("signal: {signal}"),
        other => format!("{other:?}"),
    }
}
