//! Common test utilities and infrastructure
//!
//! Shared fixtures and helpers for the harness integration tests. Every test
//! drives real shell processes, so the helpers keep them short-lived and
//! isolated (own ports, own temp directories).

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{HarnessBuilder, TestHelpers};
