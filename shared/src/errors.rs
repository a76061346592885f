//! Shared error types for the integration harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid UUID: {input}")]
    InvalidUuid { input: String },

    #[error("Unknown component: {name}")]
    UnknownComponent { name: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
