//! Moshell Runtime - Shell process lifecycle, session registry, and event relay
//!
//! This crate provides the low-level runtime infrastructure for running
//! interactive `mongosh` processes on behalf of logical client sessions:
//!
//! - **Binary locating**: Finding the mongo shell executable on the host
//! - **Process management**: Spawning a shell child process with piped stdio
//! - **Session registry**: The single source of truth for which sessions
//!   currently own a live shell process
//! - **Event relay**: Translating child stdout/stderr/exit events into
//!   transcript entries and registry state changes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   moshell    │  Connection profiles, URL building, ShellBroker
//! └──────┬───────┘
//!        │ orchestrates
//! ┌──────▼───────────┐
//! │ moshell-runtime  │  This crate
//! │  ┌────────────┐  │
//! │  │ Registry   │  │  session id -> live ShellHandle
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ Relay      │  │  stdout/stderr/exit -> transcript + registry
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ Process    │  │  spawn mongosh with piped stdio
//! │  └────────────┘  │
//! └──────────────────┘
//! ```
//!
//! # Collaborator seams
//!
//! Persistence and error reporting are behind the [`TranscriptStore`] and
//! [`ErrorReporter`] traits so the runtime stays independent of any storage
//! backend. In-memory and tracing-based defaults are provided for embedding
//! and tests.

pub mod error;
pub mod locator;
pub mod process;
pub mod registry;
pub mod relay;
pub mod reporter;
pub mod transcript;

// Re-export key types at crate root
pub use error::{Error, Result};
pub use locator::{BinaryLocator, SystemLocator};
pub use process::{ShellProcess, spawn_shell};
pub use registry::{SessionRegistry, ShellHandle};
pub use relay::{RelayContext, attach};
pub use reporter::{ErrorReporter, ReportContext, TracingReporter};
pub use transcript::{
    EntryKind, MemoryTranscriptStore, TranscriptEntry, TranscriptStore, now_millis,
};
