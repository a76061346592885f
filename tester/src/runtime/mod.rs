//! Runtime Management
//!
//! This module handles the workspace, child processes, readiness probing and
//! signal handling during a harness run.

pub mod commands;
pub mod probe;
pub mod signals;
pub mod supervisor;
pub mod workspace;

// Re-export main types
pub use commands::RealCommandRunner;
pub use probe::{ReadinessProber, ReadinessTarget};
pub use signals::{ignore_termination_signals, spawn_reaper};
pub use supervisor::{ManagedProcess, ProcessSupervisor};
pub use workspace::{Workspace, WorkspaceManager};
