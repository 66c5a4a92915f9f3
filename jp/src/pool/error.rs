//! Pool error types

use std::io;
use thiserror::Error;

/// Errors raised by the job pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Job command is empty")]
    EmptyCommand,

    #[error("Failed to launch job {identity} ({program})")]
    Launch {
        identity: String,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to query status of job {identity}")]
    Monitor {
        identity: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to kill job {identity}")]
    Kill {
        identity: String,
        #[source]
        source: io::Error,
    },
}

impl PoolError {
    /// Identity of the job this error concerns, if any
    pub fn identity(&self) -> Option<&str> {
        match self {
            PoolError::Launch { identity, .. } | PoolError::Monitor { identity, .. } | PoolError::Kill { identity, .. } => {
                Some(identity)
            }
            PoolError::InvalidConfig(_) | PoolError::EmptyCommand => None,
        }
    }
}
