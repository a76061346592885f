//! Shared types for the kwfs integration harness
//!
//! Contains the identifiers, lifecycle states and logging helpers used by
//! every crate in the workspace. Anything specific to running a harness
//! (configuration, process supervision, assertions) lives in `tester`.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
