//! Assertion framework
//!
//! Declarative expectations over a mounted tree, the individual filesystem
//! checks, and the suite that runs them all and reports a verdict.

pub mod assertions;
pub mod expected;
pub mod suite;

pub use assertions::{AssertionResult, CheckKind, MountAssertions};
pub use expected::{ExpectedEntry, ExpectedTree, Principal};
pub use suite::{AssertionSuite, SuiteReport};
