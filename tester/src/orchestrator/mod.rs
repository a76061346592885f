//! Integration run orchestration
//!
//! Drives one run through the forward path (build, fixture reset, server
//! start and readiness, fixture load, client mount, assertions) and then
//! tears everything down in reverse acquisition order. Teardown runs exactly
//! once whether the forward path succeeded, failed or ran out of time.

pub mod outcome;
pub mod state;

pub use outcome::{
    FailureCause, RunOutcome, RunResult, StepRecord, StepStatus, TeardownAction, TeardownWarning,
};
pub use state::{RunState, Step};

use chrono::Utc;
use nix::unistd::Pid;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::time::{Instant, sleep};

use crate::config::{CommandSpec, HarnessConfig, Placeholders};
use crate::error::{TesterError, TesterResult};
use crate::runtime::{ProcessSupervisor, ReadinessProber, ReadinessTarget, Workspace, WorkspaceManager};
use crate::testing::{AssertionSuite, ExpectedTree, SuiteReport};
use crate::traits::CommandRunner;
use shared::{Component, ProcessState, RunId, component_debug, component_error, component_info, component_warn, logging};

pub struct Orchestrator<R: CommandRunner> {
    run_id: RunId,
    config: HarnessConfig,
    runner: R,
    supervisor: ProcessSupervisor,
    workspaces: WorkspaceManager,
    prober: ReadinessProber,
    suite: AssertionSuite,

    state: RunState,
    workspace: Option<Workspace>,
    server_jar: Option<PathBuf>,
    client: Option<Pid>,
    readiness_confirmed: bool,
    mount_attempted: bool,
    mount_confirmed: bool,
    torn_down: bool,

    steps: Vec<StepRecord>,
    report: Option<SuiteReport>,
}

impl<R: CommandRunner> Orchestrator<R> {
    /// `expected` is used unless the configuration names an expected-tree file
    pub fn new(config: HarnessConfig, runner: R, supervisor: ProcessSupervisor, expected: ExpectedTree) -> Self {
        let run_id = RunId::new();
        let workspaces = WorkspaceManager::new(format!("{}-{}-", config.workspace_prefix, run_id.short()))
            .in_dir(config.workspace_base.clone());
        let prober = ReadinessProber::new().with_backoff(config.readiness_backoff());

        Self {
            run_id,
            config,
            runner,
            supervisor,
            workspaces,
            prober,
            suite: AssertionSuite::new(expected),
            state: RunState::INITIAL,
            workspace: None,
            server_jar: None,
            client: None,
            readiness_confirmed: false,
            mount_attempted: false,
            mount_confirmed: false,
            torn_down: false,
            steps: Vec::new(),
            report: None,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Execute the forward path under the run deadline, then tear down
    pub async fn run(&mut self) -> RunOutcome {
        component_info!(Component::Tester, "🎯 Starting integration run {}", self.run_id);

        let deadline = self.config.run_timeout();
        let forward = tokio::time::timeout(deadline, self.forward()).await;
        let primary_error = match forward {
            Ok(Ok(())) => None,
            Ok(Err(cause)) => Some(cause),
            Err(_) => Some(self.abandon_running_step(TesterError::timeout("the integration run", deadline))),
        };

        if let Some(cause) = &primary_error {
            component_error!(Component::Tester, "❌ {} failed: {}", cause.step, cause.message);
        }

        let warnings = self.teardown().await;
        let result = if primary_error.is_none() {
            RunResult::Success
        } else {
            RunResult::Failure
        };

        RunOutcome {
            run_id: self.run_id.clone(),
            result,
            steps: self.steps.clone(),
            primary_error,
            warnings,
            report: self.report.clone(),
            final_state: self.state,
            workspace_root: self.workspace.as_ref().map(|w| w.root().to_path_buf()),
        }
    }

    async fn forward(&mut self) -> Result<(), FailureCause> {
        for step in Step::SEQUENCE {
            if let Err(e) = self.enter(step.state()) {
                return Err(FailureCause::new(step, &e));
            }

            let index = self.begin(step);
            match self.execute(step).await {
                Ok(notes) if notes.is_empty() => self.finish(index, StepStatus::Succeeded),
                Ok(notes) => self.finish(index, StepStatus::Degraded { notes }),
                Err(e) => {
                    self.finish(
                        index,
                        StepStatus::Failed {
                            kind: e.kind(),
                            message: e.to_string(),
                        },
                    );
                    return Err(FailureCause::new(step, &e));
                }
            }
        }
        Ok(())
    }

    /// Advance by successor until `target` is reached
    fn enter(&mut self, target: RunState) -> TesterResult<()> {
        while self.state != target {
            match self.state.successor() {
                Some(next) if !next.is_teardown() => self.transition(next),
                _ => {
                    return Err(TesterError::OutOfOrder {
                        step: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: RunState) {
        component_info!(Component::Tester, "➡️ {} -> {}", self.state, next);
        self.state = next;
    }

    fn begin(&mut self, step: Step) -> usize {
        logging::log_progress(&Component::Tester, "Step", &step.to_string());
        self.steps.push(StepRecord {
            step,
            state: self.state,
            started_at: Utc::now(),
            finished_at: None,
            status: StepStatus::Running,
        });
        self.steps.len() - 1
    }

    fn finish(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.steps.get_mut(index) {
            record.finished_at = Some(Utc::now());
            record.status = status;
        }
    }

    /// Mark the step interrupted by the run deadline as failed
    fn abandon_running_step(&mut self, error: TesterError) -> FailureCause {
        let running = self.steps.iter().rposition(|r| r.status == StepStatus::Running);
        let step = match running {
            Some(index) => {
                self.finish(
                    index,
                    StepStatus::Failed {
                        kind: error.kind(),
                        message: error.to_string(),
                    },
                );
                self.steps[index].step
            }
            None => self.steps.last().map(|r| r.step).unwrap_or(Step::Build),
        };
        FailureCause::new(step, &error)
    }

    async fn execute(&mut self, step: Step) -> TesterResult<Vec<String>> {
        match step {
            Step::Build => self.build().await,
            Step::ResetFixtures => self.reset_fixtures().await,
            Step::StartServer => self.start_server().await,
            Step::AwaitReadiness => self.await_readiness().await,
            Step::LoadFixtures => self.load_fixtures().await,
            Step::StartClient => self.start_client().await,
            Step::AwaitMount => self.await_mount().await,
            Step::RunAssertions => self.run_assertions().await,
        }
    }

    /// Placeholder values, including the server jar and workspace paths once known
    fn placeholders(&self) -> Placeholders {
        let mut placeholders = self.config.placeholders();
        if let Some(jar) = &self.server_jar {
            placeholders = placeholders.with("server_jar", jar.display().to_string());
        }
        if let Some(workspace) = &self.workspace {
            placeholders = placeholders
                .with("workspace", workspace.root().display().to_string())
                .with("mount_point", workspace.mount_point().display().to_string());
        }
        placeholders
    }

    fn mount_point(&self) -> TesterResult<&Path> {
        match &self.workspace {
            Some(workspace) if !workspace.is_destroyed() => Ok(workspace.mount_point()),
            _ => Err(TesterError::OutOfOrder {
                step: "mount point access".to_string(),
            }),
        }
    }

    async fn run_required(&self, command: &CommandSpec) -> TesterResult<()> {
        let command = command.expand(&self.placeholders());
        component_info!(Component::Collaborator, "⚙️ Running `{}`", command);
        let outcome = self.runner.run(&command).await?;
        if outcome.success {
            Ok(())
        } else {
            Err(TesterError::CommandFailed {
                command: command.to_string(),
                status: outcome.status,
            })
        }
    }

    /// Run a command whose failure is only noted
    async fn run_best_effort(&self, command: &CommandSpec, notes: &mut Vec<String>) {
        if let Err(e) = self.run_required(command).await {
            logging::log_warning(&Component::Collaborator, "Best-effort command failed", &e);
            notes.push(e.to_string());
        }
    }

    async fn build(&mut self) -> TesterResult<Vec<String>> {
        self.workspace = Some(self.workspaces.create()?);

        // Assertions read the run's own copy, not the caller's file
        if let (Some(tree), Some(workspace)) = (&self.config.expected_tree, &self.workspace) {
            let staged = self.workspaces.stage(workspace, tree)?;
            self.suite = AssertionSuite::new(ExpectedTree::load(&staged)?);
            component_debug!(Component::Tester, "Expected tree loaded from {}", staged.display());
        }

        for command in &self.config.build {
            self.run_required(command).await?;
        }

        if self.config.needs_server_jar() {
            let jar = self.config.locate_server_jar()?;
            component_info!(Component::Server, "📦 Using {}", jar.display());
            self.server_jar = Some(jar);
        }
        Ok(Vec::new())
    }

    async fn reset_fixtures(&mut self) -> TesterResult<Vec<String>> {
        let mut notes = Vec::new();
        for command in &self.config.reset {
            self.run_best_effort(command, &mut notes).await;
        }
        if let Some(migrate) = &self.config.migrate {
            self.run_best_effort(migrate, &mut notes).await;
        }
        Ok(notes)
    }

    async fn start_server(&mut self) -> TesterResult<Vec<String>> {
        let command = self.config.server.expand(&self.placeholders());
        self.supervisor.spawn(Component::Server, &command, true).await?;
        Ok(Vec::new())
    }

    async fn await_readiness(&mut self) -> TesterResult<Vec<String>> {
        let target = ReadinessTarget::new(
            self.config.server_host.clone(),
            self.config.server_port,
            self.config.readiness_timeout(),
        );
        self.prober.wait_ready(&target).await?;
        self.readiness_confirmed = true;
        component_info!(Component::Server, "✅ Server ready on {}", target.address());
        Ok(Vec::new())
    }

    async fn load_fixtures(&mut self) -> TesterResult<Vec<String>> {
        if !self.readiness_confirmed {
            return Err(TesterError::OutOfOrder {
                step: Step::LoadFixtures.to_string(),
            });
        }
        self.run_required(&self.config.fixture_loader).await?;
        Ok(Vec::new())
    }

    async fn start_client(&mut self) -> TesterResult<Vec<String>> {
        let command = self.config.client.expand(&self.placeholders());
        self.mount_attempted = true;
        let record = self.supervisor.spawn(Component::Client, &command, true).await?;
        self.client = Some(record.pid);
        Ok(Vec::new())
    }

    /// Wait for the liveness marker; the client exiting first is a mount failure
    async fn await_mount(&mut self) -> TesterResult<Vec<String>> {
        let mount_point = self.mount_point()?.to_path_buf();
        let marker = mount_point.join(&self.config.mount_marker);
        let timeout = self.config.mount_timeout();
        let deadline = Instant::now() + timeout;

        component_info!(Component::Client, "⏳ Waiting for {}", marker.display());

        loop {
            if tokio::fs::symlink_metadata(&marker).await.is_ok() {
                self.mount_confirmed = true;
                component_info!(Component::Client, "✅ Mounted at {}", mount_point.display());
                return Ok(Vec::new());
            }

            self.supervisor.reap().await;
            if let Some(pid) = self.client {
                if self.supervisor.state(pid).await == Some(ProcessState::Reaped) {
                    return Err(TesterError::MountFailed { mount_point });
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TesterError::timeout(format!("mount marker {}", marker.display()), timeout));
            }
            sleep(self.config.readiness_backoff().min(remaining)).await;
        }
    }

    async fn run_assertions(&mut self) -> TesterResult<Vec<String>> {
        if !(self.readiness_confirmed && self.mount_confirmed) {
            return Err(TesterError::OutOfOrder {
                step: Step::RunAssertions.to_string(),
            });
        }

        let mount_point = self.mount_point()?.to_path_buf();
        let report = self.suite.run(&mount_point);
        report.log_summary();
        let passed = report.passed();
        let (failed, total) = (report.failed_count(), report.total());
        self.report = Some(report);

        if passed {
            Ok(Vec::new())
        } else {
            Err(TesterError::Assertion { failed, total })
        }
    }

    /// Release everything acquired by the forward path.
    ///
    /// Runs at most once; later calls return no warnings. Each action is
    /// attempted even if an earlier one failed.
    pub async fn teardown(&mut self) -> Vec<TeardownWarning> {
        if self.torn_down {
            component_debug!(Component::Tester, "Teardown already ran");
            return Vec::new();
        }
        self.torn_down = true;
        self.transition(RunState::TearingDown);

        let mut warnings = Vec::new();
        let grace = self.config.grace_period();

        let mounted_workspace = self.workspace.as_ref().is_some_and(|w| !w.is_destroyed());
        if self.mount_attempted && mounted_workspace {
            // Dropping the command on expiry kills its process group
            let limit = self.config.unmount_timeout();
            let unmounted = tokio::time::timeout(limit, self.run_required(&self.config.unmount)).await;
            let failure = match unmounted {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(_) => Some(TesterError::timeout(format!("`{}` to finish", self.config.unmount), limit)),
            };
            if let Some(e) = failure {
                warnings.push(self.warn(TeardownAction::Unmount, e.to_string()));
            }
        }

        // Every supervised process, newest first, including any whose spawn
        // the run deadline interrupted before the orchestrator saw its pid
        for record in self.supervisor.records().await.into_iter().rev() {
            let action = match record.component {
                Component::Client => TeardownAction::TerminateClient,
                _ => TeardownAction::TerminateServer,
            };
            if let Err(e) = self.supervisor.terminate(record.pid, grace).await {
                warnings.push(self.warn(action, e.to_string()));
            }
        }

        let destroyed = match self.workspace.as_mut() {
            Some(workspace) => self.workspaces.destroy(workspace).map(|_| ()),
            None => Ok(()),
        };
        if let Err(e) = destroyed {
            warnings.push(self.warn(TeardownAction::DestroyWorkspace, e.to_string()));
        }

        for path in self.config.scratch_paths.clone() {
            if let Err(e) = remove_path(&path) {
                warnings.push(self.warn(
                    TeardownAction::RemoveScratch,
                    format!("{}: {}", path.display(), e),
                ));
            }
        }

        self.transition(RunState::TornDown);
        component_info!(Component::Tester, "🧹 Teardown finished with {} warning(s)", warnings.len());
        warnings
    }

    fn warn(&self, action: TeardownAction, message: String) -> TeardownWarning {
        component_warn!(Component::Tester, "⚠️ Teardown {:?}: {}", action, message);
        TeardownWarning::new(action, message)
    }
}

/// Remove a file or directory tree; a missing path is not an error
fn remove_path(path: &Path) -> std::io::Result<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfigBuilder;
    use crate::error::ErrorKind;
    use crate::traits::{CommandOutcome, MockCommandRunner};
    use assert_matches::assert_matches;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn config(port: u16, base: &Path) -> HarnessConfig {
        HarnessConfig::builder()
            .workspace_base(base)
            .migrate(None)
            .server(CommandSpec::new("sleep").arg("30"))
            .server_addr("127.0.0.1", port)
            .client(CommandSpec::shell(
                "mkdir -p {mount_point}/.json && touch {mount_point}/.running && exec sleep 30",
            ))
            .scratch_paths(Vec::new())
            .readiness_timeout(Duration::from_secs(5))
            .readiness_backoff(Duration::from_millis(50))
            .mount_timeout(Duration::from_secs(5))
            .grace_period(Duration::from_secs(5))
            .build()
    }

    fn marker_only() -> ExpectedTree {
        ExpectedTree {
            markers: vec![PathBuf::from(".running")],
            ..ExpectedTree::default()
        }
    }

    #[tokio::test]
    async fn test_build_failure_skips_everything_else() {
        let base = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_| Ok(CommandOutcome::failed(1)));

        let mut orchestrator = Orchestrator::new(
            config(4444, base.path()),
            runner,
            ProcessSupervisor::new(),
            ExpectedTree::kwfs_fixture(),
        );
        let outcome = orchestrator.run().await;

        assert_eq!(outcome.result, RunResult::Failure);
        let cause = outcome.primary_error.clone().unwrap();
        assert_eq!(cause.step, Step::Build);
        assert_eq!(cause.kind, ErrorKind::CommandFailed);
        assert_eq!(outcome.steps.len(), 1);
        assert!(outcome.warnings.is_empty());
        assert!(orchestrator.supervisor().records().await.is_empty());
        assert!(!outcome.workspace_root.unwrap().exists());
        assert_eq!(outcome.final_state, RunState::TornDown);
    }

    #[tokio::test]
    async fn test_reset_failure_is_not_fatal() {
        let base = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|command| {
            if command.program == "dropdb" {
                Ok(CommandOutcome::failed(1))
            } else {
                Ok(CommandOutcome::succeeded())
            }
        });

        let mut orchestrator =
            Orchestrator::new(config(port, base.path()), runner, ProcessSupervisor::new(), marker_only());
        let outcome = orchestrator.run().await;

        assert_eq!(outcome.result, RunResult::Success, "{:?}", outcome.primary_error);
        let reset = outcome.step(Step::ResetFixtures).unwrap();
        assert_matches!(&reset.status, StepStatus::Degraded { notes } if notes.len() == 1);
        assert!(outcome.report.as_ref().unwrap().passed());
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    }

    #[tokio::test]
    async fn test_fixture_load_waits_for_readiness() {
        let base = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|_| Ok(CommandOutcome::succeeded()));

        let mut orchestrator =
            Orchestrator::new(config(port, base.path()), runner, ProcessSupervisor::new(), marker_only());
        let outcome = orchestrator.run().await;
        assert!(outcome.succeeded());

        let ready = outcome.step(Step::AwaitReadiness).unwrap();
        let load = outcome.step(Step::LoadFixtures).unwrap();
        assert!(load.started_at >= ready.finished_at.unwrap());

        let mounted = outcome.step(Step::AwaitMount).unwrap();
        let assertions = outcome.step(Step::RunAssertions).unwrap();
        assert!(assertions.started_at >= mounted.finished_at.unwrap());
        assert_eq!(assertions.state, RunState::AssertionsRunning);
    }

    #[tokio::test]
    async fn test_assertions_refused_before_mount() {
        let base = tempfile::tempdir().unwrap();
        let runner = MockCommandRunner::new();
        let mut orchestrator =
            Orchestrator::new(config(4444, base.path()), runner, ProcessSupervisor::new(), marker_only());

        let result = orchestrator.run_assertions().await;
        assert_matches!(result, Err(TesterError::OutOfOrder { .. }));
        assert!(orchestrator.report.is_none());
    }

    #[tokio::test]
    async fn test_teardown_runs_once() {
        let base = tempfile::tempdir().unwrap();
        let runner = MockCommandRunner::new();
        let mut orchestrator =
            Orchestrator::new(config(4444, base.path()), runner, ProcessSupervisor::new(), marker_only());

        assert!(orchestrator.teardown().await.is_empty());
        assert_eq!(orchestrator.state(), RunState::TornDown);
        assert!(orchestrator.teardown().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_server_jar_fails_before_spawning() {
        let base = tempfile::tempdir().unwrap();
        let jars = tempfile::tempdir().unwrap();
        let config = HarnessConfig::builder()
            .workspace_base(base.path())
            .skip_build()
            .server_jar(jars.path().join("keywhiz-server-*-SNAPSHOT-shaded.jar").display().to_string())
            .build();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);

        let mut orchestrator = Orchestrator::new(config, runner, ProcessSupervisor::new(), marker_only());
        let outcome = orchestrator.run().await;

        let cause = outcome.primary_error.clone().unwrap();
        assert_eq!(cause.step, Step::Build);
        assert_eq!(cause.kind, ErrorKind::ConfigError);
        assert!(cause.message.contains("Cannot find keywhiz JAR"));
        assert!(orchestrator.supervisor().records().await.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_server_jar_reaches_collaborators() {
        let base = tempfile::tempdir().unwrap();
        let jars = tempfile::tempdir().unwrap();
        let jar = jars.path().join("keywhiz-server-0.7.11-SNAPSHOT-shaded.jar");
        std::fs::write(&jar, b"").unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = HarnessConfigBuilder::from_config(config(port, base.path()))
            .skip_build()
            .server_jar(jars.path().join("keywhiz-server-*-SNAPSHOT-shaded.jar").display().to_string())
            .migrate(Some(CommandSpec::new("java").args(["-jar", "{server_jar}", "migrate"])))
            .build();

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(move |command| {
            recorded.lock().unwrap().push(command.clone());
            Ok(CommandOutcome::succeeded())
        });

        let mut orchestrator = Orchestrator::new(config, runner, ProcessSupervisor::new(), marker_only());
        let outcome = orchestrator.run().await;

        assert!(outcome.succeeded(), "{:?}", outcome.primary_error);
        let seen = seen.lock().unwrap();
        let migrate = seen.iter().find(|c| c.program == "java").unwrap();
        assert_eq!(migrate.args[1], jar.display().to_string());
    }

    #[tokio::test]
    async fn test_configured_tree_is_read_from_staged_copy() {
        let base = tempfile::tempdir().unwrap();
        let source = tempfile::tempdir().unwrap();
        let tree_file = source.path().join("expected.json");
        std::fs::write(&tree_file, serde_json::to_string(&marker_only()).unwrap()).unwrap();

        let config = HarnessConfigBuilder::from_config(config(4444, base.path()))
            .skip_build()
            .expected_tree(tree_file.clone())
            .build();
        let mut orchestrator =
            Orchestrator::new(config, MockCommandRunner::new(), ProcessSupervisor::new(), ExpectedTree::kwfs_fixture());

        orchestrator.build().await.unwrap();
        std::fs::remove_file(&tree_file).unwrap();

        let root = orchestrator.workspace.as_ref().unwrap().root().to_path_buf();
        assert!(root.join("expected.json").exists());
        assert_eq!(orchestrator.suite.expected(), &marker_only());
        orchestrator.teardown().await;
    }

    #[tokio::test]
    async fn test_workspace_named_after_run() {
        let base = tempfile::tempdir().unwrap();
        let config = HarnessConfigBuilder::from_config(config(4444, base.path())).skip_build().build();
        let mut orchestrator =
            Orchestrator::new(config, MockCommandRunner::new(), ProcessSupervisor::new(), marker_only());

        orchestrator.build().await.unwrap();

        let root = orchestrator.workspace.as_ref().unwrap().root().to_path_buf();
        let name = root.file_name().unwrap().to_string_lossy().to_string();
        let prefix = format!("kwfs-integration-test-{}-", orchestrator.run_id().short());
        assert!(name.starts_with(&prefix), "{name}");
        orchestrator.teardown().await;
    }

    #[tokio::test]
    async fn test_teardown_terminates_every_supervised_process() {
        let base = tempfile::tempdir().unwrap();
        let mut orchestrator =
            Orchestrator::new(config(4444, base.path()), MockCommandRunner::new(), ProcessSupervisor::new(), marker_only());

        // Spawned on the shared table but never handed back to the orchestrator
        let record = orchestrator
            .supervisor()
            .spawn(Component::Server, &CommandSpec::new("sleep").arg("30"), true)
            .await
            .unwrap();

        let warnings = orchestrator.teardown().await;

        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(orchestrator.supervisor().state(record.pid).await, Some(ProcessState::Reaped));
    }

    #[test]
    fn test_remove_path_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("certs_review");
        std::fs::create_dir_all(nested.join("inner")).unwrap();

        remove_path(&nested).unwrap();
        assert!(!nested.exists());
        remove_path(&nested).unwrap();
    }
}
