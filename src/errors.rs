//! Error taxonomy shared across the engine and its adapters.
//!
//! Build and test failures are ordinary TCR signals, not errors; they are
//! recorded as session [`Status`] without flowing through here.

use crate::status::Status;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TcrError {
    /// Invalid base directory, undetectable language, unsupported or
    /// incompatible toolchain. Fatal at init.
    #[error("{0}")]
    Config(String),

    /// A git subprocess failed. Fatal at init, recorded-and-continue
    /// during a cycle.
    #[error("git: {0}")]
    Git(String),

    /// Unexpected failure outside the two categories above.
    #[error("{0}")]
    Other(String),
}

impl TcrError {
    /// Session status this error records.
    pub fn status(&self) -> Status {
        match self {
            TcrError::Config(_) => Status::ConfigError,
            TcrError::Git(_) => Status::GitError,
            TcrError::Other(_) => Status::OtherError,
        }
    }
}

impl From<std::io::Error> for TcrError {
    fn from(e: std::io::Error) -> Self {
        TcrError::Other(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TcrError>;
