//! Configuration Management
//!
//! This module provides the harness configuration, its builder and the
//! description of external collaborator commands.

pub mod builder;
pub mod command;
pub mod harness;

// Re-export main types
pub use builder::HarnessConfigBuilder;
pub use command::{CommandSpec, Placeholders};
pub use harness::HarnessConfig;
