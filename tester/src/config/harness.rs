//! Harness Configuration
//!
//! Describes every collaborator of an integration run and the deadlines that
//! bound each blocking wait. Defaults reproduce the keywhiz + kwfs setup; a
//! JSON file can override any subset of fields.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::command::{CommandSpec, Placeholders};
use crate::error::{TesterError, TesterResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Prefix of the temporary workspace directory
    pub workspace_prefix: String,
    /// Directory in which the workspace is created (system temp dir if unset)
    pub workspace_base: Option<PathBuf>,

    /// Artifact builds; any failure aborts the run
    pub build: Vec<CommandSpec>,
    /// Database drop/create; failures are logged and ignored
    pub reset: Vec<CommandSpec>,
    /// Schema migration run after the reset; failures are logged and ignored
    pub migrate: Option<CommandSpec>,

    pub server: CommandSpec,
    /// Glob locating the shaded server jar, substituted as `{server_jar}`
    /// once the build has produced it
    pub server_jar: String,
    pub server_config: PathBuf,
    pub server_host: String,
    pub server_port: u16,

    /// Populates the database once the server is accepting connections
    pub fixture_loader: CommandSpec,

    pub client: CommandSpec,
    pub ca_cert: PathBuf,
    pub client_key: PathBuf,
    pub server_url: String,
    pub unmount: CommandSpec,

    /// Liveness marker exposed by the client, relative to the mount point
    pub mount_marker: PathBuf,
    /// Expected-tree description; the built-in kwfs fixture is used if unset
    pub expected_tree: Option<PathBuf>,
    /// Extra paths removed at teardown (generated certificates and the like)
    pub scratch_paths: Vec<PathBuf>,

    pub readiness_timeout_ms: u64,
    pub readiness_backoff_ms: u64,
    pub mount_timeout_ms: u64,
    /// Deadline for the unmount command at teardown
    pub unmount_timeout_ms: u64,
    pub grace_period_ms: u64,
    pub run_timeout_ms: u64,
    /// Send SIGKILL to a process group that outlives its grace period
    pub force_kill_after_grace: bool,

    pub log_level: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workspace_prefix: "kwfs-integration-test".to_string(),
            workspace_base: None,
            build: vec![
                CommandSpec::new("mvn").args(["package", "-Dmaven.test.skip=true", "-am", "-pl", "server"]),
            ],
            reset: vec![
                CommandSpec::new("dropdb").arg("keywhiz_development"),
                CommandSpec::new("createdb").arg("keywhiz_development"),
            ],
            migrate: Some(CommandSpec::new("java").args(["-jar", "{server_jar}", "migrate", "{server_config}"])),
            server: CommandSpec::new("java").args(["-jar", "{server_jar}", "server", "{server_config}"]),
            server_jar: "server/target/keywhiz-server-*-SNAPSHOT-shaded.jar".to_string(),
            server_config: PathBuf::from("server/src/main/resources/keywhiz-development.yaml"),
            server_host: "127.0.0.1".to_string(),
            server_port: 4444,
            fixture_loader: CommandSpec::new("psql").args([
                "keywhiz_development",
                "-f",
                "server/src/test/resources/server_test_data.sql",
            ]),
            client: CommandSpec::new("keywhiz-fs/keywhiz-fs").args([
                "-f",
                "-v",
                "-C",
                "{ca_cert}",
                "-k",
                "{client_key}",
                "{server_url}",
                "{mount_point}",
            ]),
            ca_cert: PathBuf::from("server/src/test/resources/CA/cacert.crt"),
            client_key: PathBuf::from("keywhiz-fs/test/client.pem"),
            server_url: "https://localhost:4444".to_string(),
            unmount: CommandSpec::new("umount").arg("{mount_point}"),
            mount_marker: PathBuf::from(".running"),
            expected_tree: None,
            scratch_paths: vec![PathBuf::from("server/src/test/resources/certs_review")],
            readiness_timeout_ms: 360_000,
            readiness_backoff_ms: 250,
            mount_timeout_ms: 60_000,
            unmount_timeout_ms: 30_000,
            grace_period_ms: 2000,
            run_timeout_ms: 1_800_000,
            force_kill_after_grace: false,
            log_level: "info".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Create a new builder
    pub fn builder() -> crate::config::builder::HarnessConfigBuilder {
        crate::config::builder::HarnessConfigBuilder::new()
    }

    /// Load a configuration file; missing fields keep their defaults
    pub fn load(path: &Path) -> TesterResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TesterError::config("config", format!("cannot read {}: {e}", path.display())))?;
        let config: HarnessConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn readiness_backoff(&self) -> Duration {
        Duration::from_millis(self.readiness_backoff_ms)
    }

    pub fn mount_timeout(&self) -> Duration {
        Duration::from_millis(self.mount_timeout_ms)
    }

    pub fn unmount_timeout(&self) -> Duration {
        Duration::from_millis(self.unmount_timeout_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    /// Whether any collaborator is launched from the server jar
    pub fn needs_server_jar(&self) -> bool {
        self.server.mentions("server_jar") || self.migrate.as_ref().is_some_and(|m| m.mentions("server_jar"))
    }

    /// Resolve `server_jar` against the files the build produced.
    ///
    /// Several matches (e.g. stale versions) resolve to the last one in
    /// lexical order. No match is a configuration error.
    pub fn locate_server_jar(&self) -> TesterResult<PathBuf> {
        let paths = glob::glob(&self.server_jar)
            .map_err(|e| TesterError::config("server_jar", format!("invalid pattern {}: {e}", self.server_jar)))?;

        let mut matches: Vec<PathBuf> = paths.filter_map(Result::ok).filter(|p| p.is_file()).collect();
        matches.sort();
        matches
            .pop()
            .ok_or_else(|| TesterError::config("server_jar", format!("Cannot find keywhiz JAR matching {}", self.server_jar)))
    }

    /// Placeholder values known before a workspace exists
    pub fn placeholders(&self) -> Placeholders {
        Placeholders::new()
            .with("server_config", self.server_config.display().to_string())
            .with("server_host", self.server_host.clone())
            .with("server_port", self.server_port.to_string())
            .with("server_url", self.server_url.clone())
            .with("ca_cert", self.ca_cert.display().to_string())
            .with("client_key", self.client_key.display().to_string())
    }

    /// Reject configurations that could never complete a run
    pub fn validate(&self) -> TesterResult<()> {
        if self.server_port == 0 {
            return Err(TesterError::config("server_port", "must be a fixed, non-zero port"));
        }
        if self.server_host.trim().is_empty() {
            return Err(TesterError::config("server_host", "must not be empty"));
        }

        let deadlines = [
            ("readiness_timeout_ms", self.readiness_timeout_ms),
            ("mount_timeout_ms", self.mount_timeout_ms),
            ("unmount_timeout_ms", self.unmount_timeout_ms),
            ("run_timeout_ms", self.run_timeout_ms),
        ];
        for (field, value) in deadlines {
            if value == 0 {
                return Err(TesterError::config(field, "every blocking wait needs a non-zero deadline"));
            }
        }

        let commands = [
            ("server", &self.server),
            ("fixture_loader", &self.fixture_loader),
            ("client", &self.client),
            ("unmount", &self.unmount),
        ];
        for (field, command) in commands {
            if command.program.trim().is_empty() {
                return Err(TesterError::config(field, "program must not be empty"));
            }
        }
        if self.build.iter().any(|c| c.program.trim().is_empty()) {
            return Err(TesterError::config("build", "program must not be empty"));
        }

        if self.mount_marker.as_os_str().is_empty() || self.mount_marker.is_absolute() {
            return Err(TesterError::config("mount_marker", "must be a path relative to the mount point"));
        }

        Ok(())
    }
}
