//! Process-level signal handling
//!
//! The harness must outlive interrupts long enough to run teardown, so
//! SIGINT and SIGTERM aimed at it are caught and logged instead of killing
//! it. SIGCHLD drives the supervisor's reaper.

use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;

use super::supervisor::ProcessSupervisor;
use crate::error::TesterResult;
use shared::{Component, component_debug, component_warn};

/// Catch SIGINT/SIGTERM for the lifetime of the runtime.
///
/// Installing a handler (rather than `SIG_IGN`) keeps the default disposition
/// for children, which reset handlers on exec.
pub fn ignore_termination_signals() -> TesterResult<JoinHandle<()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = interrupt.recv() => {
                    component_warn!(Component::Tester, "⚠️ Ignoring SIGINT; teardown will still run");
                }
                Some(()) = terminate.recv() => {
                    component_warn!(Component::Tester, "⚠️ Ignoring SIGTERM; teardown will still run");
                }
                else => break,
            }
        }
    }))
}

/// Reap supervised children on every SIGCHLD
pub fn spawn_reaper(supervisor: ProcessSupervisor) -> TesterResult<JoinHandle<()>> {
    let mut child_exits = signal(SignalKind::child())?;

    Ok(tokio::spawn(async move {
        while child_exits.recv().await.is_some() {
            for pid in supervisor.reap().await {
                component_debug!(Component::Tester, "SIGCHLD: pid {} reaped", pid);
            }
        }
    }))
}
