//! Run results
//!
//! The forward path and teardown report separately: the first forward
//! failure becomes the primary cause, teardown problems only ever become
//! warnings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::state::{RunState, Step};
use crate::error::{ErrorKind, TesterError};
use crate::testing::SuiteReport;
use shared::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunResult {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Succeeded,
    /// Completed, but a best-effort action inside it failed
    Degraded { notes: Vec<String> },
    Failed { kind: ErrorKind, message: String },
}

impl StepStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: StepStatus,
}

/// First fatal error on the forward path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureCause {
    pub step: Step,
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureCause {
    pub fn new(step: Step, error: &TesterError) -> Self {
        Self {
            step,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeardownAction {
    Unmount,
    TerminateClient,
    TerminateServer,
    DestroyWorkspace,
    RemoveScratch,
}

/// Non-fatal problem hit while cleaning up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeardownWarning {
    pub action: TeardownAction,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl TeardownWarning {
    pub fn new(action: TeardownAction, message: impl Into<String>) -> Self {
        Self {
            action,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub result: RunResult,
    pub steps: Vec<StepRecord>,
    pub primary_error: Option<FailureCause>,
    pub warnings: Vec<TeardownWarning>,
    /// Present once the assertion suite has run
    pub report: Option<SuiteReport>,
    pub final_state: RunState,
    pub workspace_root: Option<PathBuf>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.result == RunResult::Success
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self.result {
            RunResult::Success => 0,
            RunResult::Failure => 1,
        }
    }

    pub fn step(&self, step: Step) -> Option<&StepRecord> {
        self.steps.iter().find(|r| r.step == step)
    }

    /// Write as pretty JSON
    pub fn write_json(&self, path: &std::path::Path) -> crate::error::TesterResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| TesterError::resource("write report", path, e))?;
        Ok(())
    }
}
