//! Run states and the steps executed in them
//!
//! The only forward move is to a state's successor, so steps can never be
//! reordered or skipped. Teardown is entered from anywhere.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    Building,
    FixturesReset,
    ServerStarting,
    ServerReady,
    FixturesLoaded,
    ClientMounting,
    ClientMounted,
    AssertionsRunning,
    TearingDown,
    TornDown,
}

impl RunState {
    pub const INITIAL: RunState = RunState::Building;

    /// Next state on the forward path, `None` once torn down
    pub fn successor(self) -> Option<RunState> {
        match self {
            RunState::Building => Some(RunState::FixturesReset),
            RunState::FixturesReset => Some(RunState::ServerStarting),
            RunState::ServerStarting => Some(RunState::ServerReady),
            RunState::ServerReady => Some(RunState::FixturesLoaded),
            RunState::FixturesLoaded => Some(RunState::ClientMounting),
            RunState::ClientMounting => Some(RunState::ClientMounted),
            RunState::ClientMounted => Some(RunState::AssertionsRunning),
            RunState::AssertionsRunning => Some(RunState::TearingDown),
            RunState::TearingDown => Some(RunState::TornDown),
            RunState::TornDown => None,
        }
    }

    pub fn is_teardown(self) -> bool {
        matches!(self, RunState::TearingDown | RunState::TornDown)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Unit of work on the forward path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    Build,
    ResetFixtures,
    StartServer,
    AwaitReadiness,
    LoadFixtures,
    StartClient,
    AwaitMount,
    RunAssertions,
}

impl Step {
    /// Forward path, in execution order
    pub const SEQUENCE: [Step; 8] = [
        Step::Build,
        Step::ResetFixtures,
        Step::StartServer,
        Step::AwaitReadiness,
        Step::LoadFixtures,
        Step::StartClient,
        Step::AwaitMount,
        Step::RunAssertions,
    ];

    /// State the run must be in while this step executes
    pub fn state(self) -> RunState {
        match self {
            Step::Build => RunState::Building,
            Step::ResetFixtures => RunState::FixturesReset,
            Step::StartServer | Step::AwaitReadiness => RunState::ServerStarting,
            Step::LoadFixtures => RunState::ServerReady,
            Step::StartClient => RunState::FixturesLoaded,
            Step::AwaitMount => RunState::ClientMounting,
            Step::RunAssertions => RunState::AssertionsRunning,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
