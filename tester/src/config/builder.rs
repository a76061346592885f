//! Harness Configuration Builder
//!
//! Provides a flexible builder pattern for constructing harness configurations

use super::{CommandSpec, HarnessConfig};
use std::path::PathBuf;
use std::time::Duration;

pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
        }
    }

    /// Start from an existing configuration (e.g. one loaded from disk)
    pub fn from_config(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Set the workspace directory prefix
    pub fn workspace_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.workspace_prefix = prefix.into();
        self
    }

    /// Create workspaces under this directory instead of the system temp dir
    pub fn workspace_base<P: Into<PathBuf>>(mut self, base: P) -> Self {
        self.config.workspace_base = Some(base.into());
        self
    }

    /// Replace the build commands
    pub fn build_commands(mut self, commands: Vec<CommandSpec>) -> Self {
        self.config.build = commands;
        self
    }

    /// Skip the build stage entirely
    pub fn skip_build(mut self) -> Self {
        self.config.build.clear();
        self
    }

    /// Replace the database reset commands
    pub fn reset_commands(mut self, commands: Vec<CommandSpec>) -> Self {
        self.config.reset = commands;
        self
    }

    /// Set or clear the migration command
    pub fn migrate(mut self, command: Option<CommandSpec>) -> Self {
        self.config.migrate = command;
        self
    }

    /// Set the server command
    pub fn server(mut self, command: CommandSpec) -> Self {
        self.config.server = command;
        self
    }

    /// Set the glob that locates the server jar after the build
    pub fn server_jar<S: Into<String>>(mut self, pattern: S) -> Self {
        self.config.server_jar = pattern.into();
        self
    }

    /// Set the server configuration file passed as `{server_config}`
    pub fn server_config<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.server_config = path.into();
        self
    }

    /// Set the address probed for readiness
    pub fn server_addr<S: Into<String>>(mut self, host: S, port: u16) -> Self {
        self.config.server_host = host.into();
        self.config.server_port = port;
        self
    }

    /// Override only the server port
    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    /// Set the fixture loader command
    pub fn fixture_loader(mut self, command: CommandSpec) -> Self {
        self.config.fixture_loader = command;
        self
    }

    /// Set the mount client command
    pub fn client(mut self, command: CommandSpec) -> Self {
        self.config.client = command;
        self
    }

    /// Set the client TLS material and the URL it connects to
    pub fn client_credentials<P: Into<PathBuf>, S: Into<String>>(mut self, ca_cert: P, client_key: P, server_url: S) -> Self {
        self.config.ca_cert = ca_cert.into();
        self.config.client_key = client_key.into();
        self.config.server_url = server_url.into();
        self
    }

    /// Set the unmount command
    pub fn unmount(mut self, command: CommandSpec) -> Self {
        self.config.unmount = command;
        self
    }

    /// Set the liveness marker path relative to the mount point
    pub fn mount_marker<P: Into<PathBuf>>(mut self, marker: P) -> Self {
        self.config.mount_marker = marker.into();
        self
    }

    /// Load the expected tree from a JSON description
    pub fn expected_tree<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.expected_tree = Some(path.into());
        self
    }

    /// Replace the scratch paths removed at teardown
    pub fn scratch_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.scratch_paths = paths;
        self
    }

    /// Set the readiness deadline
    pub fn readiness_timeout(mut self, timeout: Duration) -> Self {
        self.config.readiness_timeout_ms = millis(timeout);
        self
    }

    /// Set the delay between readiness attempts
    pub fn readiness_backoff(mut self, backoff: Duration) -> Self {
        self.config.readiness_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Set the deadline for the mount marker to appear
    pub fn mount_timeout(mut self, timeout: Duration) -> Self {
        self.config.mount_timeout_ms = millis(timeout);
        self
    }

    /// Set the deadline for the unmount command at teardown
    pub fn unmount_timeout(mut self, timeout: Duration) -> Self {
        self.config.unmount_timeout_ms = millis(timeout);
        self
    }

    /// Set the termination grace period
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config.grace_period_ms = grace.as_millis() as u64;
        self
    }

    /// Set the deadline for the whole forward path
    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.config.run_timeout_ms = millis(timeout);
        self
    }

    /// Escalate to SIGKILL when a process group outlives its grace period
    pub fn force_kill_after_grace(mut self, enabled: bool) -> Self {
        self.config.force_kill_after_grace = enabled;
        self
    }

    /// Set log level (trace, debug, info, warn, error)
    pub fn log_level<S: Into<String>>(mut self, level: S) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> HarnessConfig {
        self.config
    }
}

/// Deadlines are stored in whole milliseconds and never round down to zero
fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl Default for HarnessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
