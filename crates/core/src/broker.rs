//! Command dispatcher: the public entry points for shell sessions.
//!
//! The broker orchestrates the runtime pieces: it looks sessions up in the
//! registry, spawns a shell through the locator and connection resolver when
//! none is live, attaches the event relay, and writes commands to the
//! session's stdin. One broker instance is constructed at process start and
//! shared by reference with whichever layer handles incoming session
//! requests; there is no ambient global state.
//!
//! Same-session workflows are serialized on a per-session async mutex, so a
//! burst of calls for one session spawns at most one process while distinct
//! sessions proceed fully in parallel.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use moshell_runtime::relay::{self, DEFAULT_PURGE_DELAY, RelayContext};
use moshell_runtime::{
    BinaryLocator, ErrorReporter, ReportContext, SessionRegistry, ShellHandle, SystemLocator,
    TracingReporter, TranscriptStore, spawn_shell,
};

use crate::connection::{ConnectionProfile, ConnectionResolver, build_connection_url};
use crate::error::{Error, Result};

/// Broker-wide settings.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Name of the shell binary handed to the locator.
    pub shell_binary: String,
    /// Grace delay between a session's close entry and its transcript purge.
    pub purge_delay: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            shell_binary: "mongosh".to_string(),
            purge_delay: DEFAULT_PURGE_DELAY,
        }
    }
}

/// Inputs for [`ShellBroker::connect_to_shell`].
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub connection_id: String,
    pub username: String,
    pub password: String,
    pub session_id: String,
}

/// Inputs for [`ShellBroker::execute_shell_command`].
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub command: String,
    pub connection_id: String,
    pub username: String,
    pub password: String,
    pub session_id: String,
}

impl ExecuteRequest {
    fn connect_request(&self) -> ConnectRequest {
        ConnectRequest {
            connection_id: self.connection_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

/// Session broker over interactive mongo shell processes.
pub struct ShellBroker {
    registry: Arc<SessionRegistry>,
    resolver: Arc<dyn ConnectionResolver>,
    locator: Arc<dyn BinaryLocator>,
    store: Arc<dyn TranscriptStore>,
    reporter: Arc<dyn ErrorReporter>,
    session_locks: DashMap<String, Arc<Mutex<()>>>,
    config: BrokerConfig,
}

impl ShellBroker {
    /// Creates a broker with the system binary locator, tracing error
    /// reporter, and default configuration.
    pub fn new(resolver: Arc<dyn ConnectionResolver>, store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            resolver,
            locator: Arc::new(SystemLocator),
            store,
            reporter: Arc::new(TracingReporter),
            session_locks: DashMap::new(),
            config: BrokerConfig::default(),
        }
    }

    /// Replaces the binary locator.
    pub fn with_locator(mut self, locator: Arc<dyn BinaryLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// Replaces the error reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replaces the broker configuration.
    pub fn with_config(mut self, config: BrokerConfig) -> Self {
        self.config = config;
        self
    }

    /// Registry of live sessions, shared with the event relay.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The transcript store this broker appends into.
    pub fn store(&self) -> &Arc<dyn TranscriptStore> {
        &self.store
    }

    /// Ensures a live shell exists for the session and selects its database.
    ///
    /// Idempotent with respect to a still-running session: a second call
    /// skips spawning and only re-issues the database selection. Returns the
    /// literal `use <database>` command string written to the shell.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownConnection`] when the profile cannot be resolved;
    /// [`Error::SpawnFailure`] when no shell process could be started (the
    /// detailed cause goes to the error reporter).
    pub async fn connect_to_shell(&self, request: &ConnectRequest) -> Result<String> {
        let lock = self.session_lock(&request.session_id);
        let guard = lock.lock().await;
        let result = self.connect_locked(request).await;
        drop(guard);
        drop(lock);
        // Session ids are client-supplied, so the lock map must not retain
        // an entry per id ever seen. Safe to drop once no workflow holds or
        // awaits it; the next call recreates the entry.
        self.session_locks
            .remove_if(&request.session_id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    async fn connect_locked(&self, request: &ConnectRequest) -> Result<String> {
        let profile = self.resolver.resolve(&request.connection_id).await?;

        if self.registry.get(&request.session_id).is_none() {
            if let Err(err) = self.spawn_session(&profile, request) {
                // Ensure no half-registered entry survives the failure.
                self.registry.clear(&request.session_id);
                self.reporter.report(
                    "shell-spawn",
                    &err,
                    &ReportContext {
                        session_id: Some(request.session_id.clone()),
                        connection_id: Some(request.connection_id.clone()),
                        username: Some(request.username.clone()),
                    },
                );
                return Err(Error::SpawnFailure);
            }
        }

        // Covers both the fresh spawn and the reuse path; a spawn that
        // "succeeded" without yielding a handle is still a failure.
        match self.registry.get(&request.session_id) {
            Some(handle) => {
                let command = format!("use {}", profile.database_name);
                info!(
                    target = "moshell",
                    session_id = %request.session_id,
                    command = %command,
                    "issuing database selection"
                );
                handle.write_line(&command).await?;
                Ok(command)
            }
            None => Err(Error::SpawnFailure),
        }
    }

    /// Writes a command to the session's shell, connecting first when no
    /// live handle exists.
    ///
    /// No direct return value: the effect surfaces asynchronously as
    /// transcript entries. If spawning fails here the command is dropped;
    /// the failure was already recorded through the error reporter.
    pub async fn execute_shell_command(&self, request: &ExecuteRequest) {
        info!(
            target = "moshell",
            session_id = %request.session_id,
            connection_id = %request.connection_id,
            command = %request.command,
            "shell command"
        );

        if self.registry.get(&request.session_id).is_none() {
            if let Err(err) = self.connect_to_shell(&request.connect_request()).await {
                warn!(
                    target = "moshell",
                    session_id = %request.session_id,
                    error = %err,
                    "connect during execute failed; command dropped"
                );
            }
        }

        if let Some(handle) = self.registry.get(&request.session_id) {
            // Fire-and-forget: a write error means the process died between
            // the lookup and the write; its exit flows through the relay.
            if let Err(err) = handle.write_line(&request.command).await {
                warn!(
                    target = "moshell",
                    session_id = %request.session_id,
                    error = %err,
                    "stdin write failed"
                );
            }
        }
    }

    /// Deletes all transcript entries for a session without touching any
    /// live process.
    pub async fn clear_shell(&self, session_id: &str) {
        info!(
            target = "moshell",
            session_id = session_id,
            "clearing shell transcript"
        );
        self.store.delete_all(session_id).await;
    }

    /// Spawns a shell for the session and attaches the event relay.
    fn spawn_session(
        &self,
        profile: &ConnectionProfile,
        request: &ConnectRequest,
    ) -> moshell_runtime::Result<()> {
        let include_auth = !request.username.is_empty();
        let url = build_connection_url(
            profile,
            include_auth,
            &request.username,
            &request.password,
            false,
        );
        let masked_url = build_connection_url(
            profile,
            include_auth,
            &request.username,
            &request.password,
            true,
        );

        let binary = self.locator.locate(&self.config.shell_binary)?;
        info!(
            target = "moshell",
            session_id = %request.session_id,
            binary = %binary.display(),
            url = %masked_url,
            "spawning shell"
        );

        let shell = spawn_shell(&binary, &url)?;
        let handle = Arc::new(ShellHandle::new(
            request.session_id.clone(),
            request.connection_id.clone(),
            shell.child.id(),
            shell.stdin,
        ));
        self.registry.insert(handle);

        relay::attach(
            RelayContext {
                session_id: request.session_id.clone(),
                connection_id: request.connection_id.clone(),
                registry: self.registry.clone(),
                store: self.store.clone(),
                reporter: self.reporter.clone(),
                purge_delay: self.config.purge_delay,
            },
            shell.child,
            shell.stdout,
            shell.stderr,
        );

        Ok(())
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.session_locks
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }
}
