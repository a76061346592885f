//! Test helpers and builder patterns for harness tests

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

use super::fixtures::TestFixtures;
use tester::*;

/// Builds a harness configuration wired to shell stand-ins
pub struct HarnessBuilder {
    builder: HarnessConfigBuilder,
    base: TempDir,
}

impl HarnessBuilder {
    /// Defaults: no build, no database, a sleeping server and a mounting client
    pub fn new(port: u16) -> Self {
        let base = tempfile::tempdir().unwrap();
        let builder = HarnessConfig::builder()
            .workspace_base(base.path())
            .skip_build()
            .reset_commands(Vec::new())
            .migrate(None)
            .server(TestFixtures::server())
            .server_addr("127.0.0.1", port)
            .fixture_loader(CommandSpec::new("true"))
            .client(TestFixtures::mounting_client())
            .unmount(CommandSpec::new("true"))
            .scratch_paths(Vec::new())
            .readiness_timeout(TestFixtures::READINESS_TIMEOUT)
            .readiness_backoff(Duration::from_millis(50))
            .mount_timeout(TestFixtures::MOUNT_TIMEOUT)
            .grace_period(TestFixtures::GRACE);

        Self { builder, base }
    }

    pub fn with(mut self, configure: impl FnOnce(HarnessConfigBuilder) -> HarnessConfigBuilder) -> Self {
        self.builder = configure(self.builder);
        self
    }

    pub fn build(self) -> (Orchestrator<RealCommandRunner>, TempDir) {
        let orchestrator = Orchestrator::new(
            self.builder.build(),
            RealCommandRunner::new(),
            ProcessSupervisor::new(),
            TestFixtures::expected_tree(),
        );
        (orchestrator, self.base)
    }
}

pub struct TestHelpers;

impl TestHelpers {
    /// Listener standing in for the server's socket
    pub async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// A port nothing listens on
    pub async fn closed_port() -> u16 {
        let (listener, port) = Self::listener().await;
        drop(listener);
        port
    }

    pub fn pid_alive(pid: Pid) -> bool {
        !matches!(kill(pid, None), Err(Errno::ESRCH))
    }

    /// Wait for a process we do not parent to disappear
    pub async fn wait_gone(pid: Pid, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if !Self::pid_alive(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        !Self::pid_alive(pid)
    }

    /// Poll for a pid written by a child process
    pub async fn read_pid(path: &PathBuf) -> Pid {
        for _ in 0..250 {
            if let Ok(raw) = std::fs::read_to_string(path) {
                if let Ok(pid) = raw.trim().parse::<i32>() {
                    return Pid::from_raw(pid);
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("{} never contained a pid", path.display());
    }

    /// Every supervised process has been reaped
    pub async fn assert_all_reaped(supervisor: &ProcessSupervisor) {
        for record in supervisor.records().await {
            assert_eq!(
                record.state,
                shared::ProcessState::Reaped,
                "{} (pid {}) left in {:?}",
                record.component,
                record.pid,
                record.state
            );
        }
    }
}
