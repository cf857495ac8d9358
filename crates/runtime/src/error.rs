//! Error types for the moshell runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the moshell runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// Mongo shell binary was not found on this host.
    #[error("mongo shell not found. Install mongosh or set MOSHELL_SHELL_PATH")]
    ShellNotFound,

    /// Failed to spawn the shell process.
    #[error("failed to spawn mongo shell: {0}")]
    SpawnFailed(String),

    /// Writing to the shell's stdin failed.
    #[error("failed to write to shell stdin: {0}")]
    StdinWrite(String),
}
