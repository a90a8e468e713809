//! Error types for renewd.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenewError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to launch {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} did not finish within {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
