//! Interactive CLI driver for the moshell session broker.
//!
//! Stands in for the web-facing layer: it builds one broker with an
//! in-memory resolver and transcript store, opens a single session, and
//! bridges terminal lines to `execute_shell_command` while printing
//! transcript entries as the relay appends them.

pub mod cli;
pub mod logging;
pub mod repl;
