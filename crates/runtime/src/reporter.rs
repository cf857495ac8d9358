//! Error-reporting collaborator contract.
//!
//! Spawn and runtime failures are recorded here with full detail; callers
//! only ever see the generic spawn-failure message.

use tracing::error;

/// Context attached to an error report.
#[derive(Debug, Default, Clone)]
pub struct ReportContext {
    pub session_id: Option<String>,
    pub connection_id: Option<String>,
    pub username: Option<String>,
}

/// Sink for structured error records.
pub trait ErrorReporter: Send + Sync {
    /// Records an error with its kind tag and session context.
    fn report(&self, kind: &str, error: &dyn std::error::Error, context: &ReportContext);
}

/// Reporter that emits structured `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, kind: &str, error: &dyn std::error::Error, context: &ReportContext) {
        error!(
            target = "moshell",
            kind = kind,
            error = %error,
            session_id = context.session_id.as_deref().unwrap_or(""),
            connection_id = context.connection_id.as_deref().unwrap_or(""),
            username = context.username.as_deref().unwrap_or(""),
            "shell error"
        );
    }
}
