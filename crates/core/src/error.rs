//! Error types for the moshell public API.
//!
//! Only spawn failures surface synchronously to callers, and only as the
//! generic message below; full detail goes to the error reporter. Everything
//! that happens after a successful spawn is observed through the transcript.

use thiserror::Error;

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the shell broker.
#[derive(Debug, Error)]
pub enum Error {
    /// The shell process could not be started. Deliberately generic: the
    /// detailed cause is recorded through the error reporter, not returned.
    #[error("couldn't spawn shell, please check logs")]
    SpawnFailure,

    /// No connection profile exists for the given identifier.
    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    /// Runtime-level failure.
    #[error(transparent)]
    Runtime(#[from] moshell_runtime::Error),
}
