//! kwfs integration-test runner
//!
//! Runs the full build → server → fixtures → mount → assertions → teardown
//! cycle once and exits 0 on success, 1 otherwise.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use shared::{Component, component_error, component_info, component_warn, logging};
use tester::{
    ExpectedTree, HarnessConfig, HarnessConfigBuilder, Orchestrator, ProcessSupervisor, RealCommandRunner,
    ignore_termination_signals, spawn_reaper,
};

/// Integration tests for the kwfs filesystem client against a live server
#[derive(Parser)]
#[command(name = "kwfs-tester")]
#[command(about = "Builds, starts and mounts the secrets stack, then verifies the mounted tree")]
struct Args {
    /// JSON harness configuration; unset fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Port the server listens on
    #[arg(long)]
    server_port: Option<u16>,

    /// Seconds to wait for the server to accept connections
    #[arg(long)]
    readiness_timeout_secs: Option<u64>,

    /// Seconds to wait for the mount marker
    #[arg(long)]
    mount_timeout_secs: Option<u64>,

    /// Seconds the unmount command may take at teardown
    #[arg(long)]
    unmount_timeout_secs: Option<u64>,

    /// Milliseconds a process group gets to exit after SIGTERM
    #[arg(long)]
    grace_ms: Option<u64>,

    /// Overall deadline for the forward path, in seconds
    #[arg(long)]
    run_timeout_secs: Option<u64>,

    /// JSON description of the expected mounted tree
    #[arg(long)]
    expected_tree: Option<PathBuf>,

    /// Write the run outcome as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip the artifact build step
    #[arg(long)]
    skip_build: bool,

    /// Send SIGKILL to process groups that outlive the grace period
    #[arg(long)]
    force_kill: bool,
}

impl Args {
    /// Layer command-line overrides over the file (or default) configuration
    fn apply(&self, config: HarnessConfig) -> HarnessConfig {
        let mut builder = HarnessConfigBuilder::from_config(config);

        if let Some(level) = &self.log_level {
            builder = builder.log_level(level.clone());
        }
        if let Some(port) = self.server_port {
            builder = builder.server_port(port);
        }
        if let Some(secs) = self.readiness_timeout_secs {
            builder = builder.readiness_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.mount_timeout_secs {
            builder = builder.mount_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.unmount_timeout_secs {
            builder = builder.unmount_timeout(Duration::from_secs(secs));
        }
        if let Some(ms) = self.grace_ms {
            builder = builder.grace_period(Duration::from_millis(ms));
        }
        if let Some(secs) = self.run_timeout_secs {
            builder = builder.run_timeout(Duration::from_secs(secs));
        }
        if let Some(path) = &self.expected_tree {
            builder = builder.expected_tree(path.clone());
        }
        if self.skip_build {
            builder = builder.skip_build();
        }
        if self.force_kill {
            builder = builder.force_kill_after_grace(true);
        }

        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let base = match &args.config {
        Some(path) => HarnessConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    let config = args.apply(base);

    logging::init_tracing(Component::Tester, Some(&config.log_level));
    config.validate().context("invalid harness configuration")?;

    logging::log_startup(
        &Component::Tester,
        &format!("server {}:{}", config.server_host, config.server_port),
    );

    // Teardown has to survive interrupts aimed at the harness
    let _signals = ignore_termination_signals().context("installing signal handlers")?;

    if let Err(e) = ProcessSupervisor::adopt_orphans() {
        component_warn!(Component::Tester, "⚠️ Could not become child subreaper: {}", e);
    }

    let supervisor = ProcessSupervisor::new().with_force_kill(config.force_kill_after_grace);
    let reaper = spawn_reaper(supervisor.clone()).context("installing SIGCHLD reaper")?;

    let report_path = args.report.clone();
    // A configured expected tree replaces the fixture once staged into the workspace
    let mut orchestrator = Orchestrator::new(config, RealCommandRunner::new(), supervisor, ExpectedTree::kwfs_fixture());
    let outcome = orchestrator.run().await;
    reaper.abort();

    if let Some(path) = report_path {
        match outcome.write_json(&path) {
            Ok(()) => {
                component_info!(Component::Tester, "📝 Wrote run report to {}", path.display());
            }
            Err(e) => logging::log_error(&Component::Tester, "Writing run report", &e),
        }
    }

    for warning in &outcome.warnings {
        component_warn!(Component::Tester, "⚠️ Teardown warning ({:?}): {}", warning.action, warning.message);
    }

    if outcome.succeeded() {
        logging::log_success(&Component::Tester, "SUCCESS");
    } else {
        if let Some(cause) = &outcome.primary_error {
            component_error!(Component::Tester, "💥 {} failed: {}", cause.step, cause.message);
        }
        component_error!(Component::Tester, "FAILURE");
    }

    logging::log_shutdown(&Component::Tester, &format!("run {} finished", outcome.run_id));
    std::process::exit(outcome.exit_code());
}
