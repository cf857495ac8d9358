//! Moshell - session broker for interactive mongo shell processes
//!
//! Lets many concurrent clients each hold an independent interactive session
//! against a `mongosh` child process, observe its output as a persisted
//! transcript, and send further commands to it. The public surface is the
//! [`ShellBroker`] with three operations:
//!
//! - [`ShellBroker::connect_to_shell`] - ensure a live shell for a session
//!   and select its database
//! - [`ShellBroker::execute_shell_command`] - write a command to the
//!   session's shell, spawning one first if needed
//! - [`ShellBroker::clear_shell`] - wipe a session's transcript
//!
//! Shell output never returns from these calls directly; it surfaces
//! asynchronously as transcript entries appended by the runtime's event
//! relay, which callers poll independently.

pub mod broker;
pub mod connection;
pub mod error;

pub use broker::{BrokerConfig, ConnectRequest, ExecuteRequest, ShellBroker};
pub use connection::{
    ConnectionProfile, ConnectionResolver, MemoryResolver, build_connection_url,
};
pub use error::{Error, Result};

// The runtime seams are part of the public API for embedders and tests.
pub use moshell_runtime;
pub use moshell_runtime::{
    BinaryLocator, EntryKind, ErrorReporter, MemoryTranscriptStore, ReportContext,
    SessionRegistry, ShellHandle, SystemLocator, TracingReporter, TranscriptEntry,
    TranscriptStore,
};
