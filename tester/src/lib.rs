//! kwfs integration-test harness
//!
//! Brings up the secrets server and the kwfs mount client, loads fixture
//! data, checks the mounted tree against an expected description and tears
//! everything down again, whatever happened on the way.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tester::*;
//!
//! # async fn example() -> TesterResult<()> {
//! let config = HarnessConfig::builder()
//!     .skip_build()
//!     .server_addr("127.0.0.1", 4444)
//!     .build();
//! config.validate()?;
//!
//! let supervisor = ProcessSupervisor::new();
//! let mut orchestrator = Orchestrator::new(
//!     config,
//!     RealCommandRunner::new(),
//!     supervisor,
//!     ExpectedTree::kwfs_fixture(),
//! );
//!
//! let outcome = orchestrator.run().await;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod runtime;
pub mod testing;
pub mod traits;

// Main interfaces
pub use config::{CommandSpec, HarnessConfig, HarnessConfigBuilder, Placeholders};
pub use error::{ErrorKind, TesterError, TesterResult};
pub use orchestrator::{Orchestrator, RunOutcome, RunResult, RunState, Step, StepStatus, TeardownWarning};

// Supporting types
pub use runtime::{ManagedProcess, ProcessSupervisor, ReadinessProber, ReadinessTarget, RealCommandRunner};
pub use runtime::{Workspace, WorkspaceManager, ignore_termination_signals, spawn_reaper};
pub use testing::{AssertionResult, AssertionSuite, ExpectedTree, Principal, SuiteReport};
pub use traits::{CommandOutcome, CommandRunner};
