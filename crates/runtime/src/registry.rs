//! Session registry: the single source of truth for live shell processes.
//!
//! Uses [`DashMap`] for lock-free concurrent access so workflows for
//! distinct session ids never block each other. Same-session workflow
//! serialization is the dispatcher's responsibility; registry mutations
//! themselves are atomic per key.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Writable handle to one session's live shell process.
///
/// Exactly one handle exists per session id at any time; it is created on
/// successful spawn and dropped when the registry entry is cleared on spawn
/// failure, process error, or process exit.
pub struct ShellHandle {
    session_id: String,
    connection_id: String,
    pid: Option<u32>,
    stdin: Mutex<ChildStdin>,
}

impl ShellHandle {
    pub fn new(
        session_id: String,
        connection_id: String,
        pid: Option<u32>,
        stdin: ChildStdin,
    ) -> Self {
        Self {
            session_id,
            connection_id,
            pid,
            stdin: Mutex::new(stdin),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// OS pid of the shell process, when the OS reported one.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Writes `line` plus a trailing newline to the shell's stdin.
    ///
    /// Fire-and-forget from the session's point of view: the effect surfaces
    /// asynchronously as transcript entries relayed from the process.
    pub async fn write_line(&self, line: &str) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::StdinWrite(e.to_string()))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| Error::StdinWrite(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| Error::StdinWrite(e.to_string()))?;
        Ok(())
    }
}

impl std::fmt::Debug for ShellHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellHandle")
            .field("session_id", &self.session_id)
            .field("connection_id", &self.connection_id)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Thread-safe mapping from session id to live shell handle.
#[derive(Default)]
pub struct SessionRegistry {
    shells: DashMap<String, Arc<ShellHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live handle for a session, if any.
    pub fn get(&self, session_id: &str) -> Option<Arc<ShellHandle>> {
        self.shells.get(session_id).map(|r| r.value().clone())
    }

    /// Installs the handle for a session, replacing any previous entry.
    pub fn insert(&self, handle: Arc<ShellHandle>) {
        self.shells
            .insert(handle.session_id().to_string(), handle);
    }

    /// Removes a session's entry. Idempotent: clearing an absent entry is a
    /// no-op. Returns whether an entry was removed.
    pub fn clear(&self, session_id: &str) -> bool {
        self.shells.remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.shells.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.shells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_is_idempotent() {
        let registry = SessionRegistry::new();
        assert!(!registry.clear("missing"));
        assert!(!registry.clear("missing"));
        assert!(registry.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn insert_get_clear_round_trip() {
        let registry = SessionRegistry::new();
        let handle = spawn_cat_handle("s1", "c1").await;
        registry.insert(handle);

        assert!(registry.contains("s1"));
        assert_eq!(registry.len(), 1);
        let fetched = registry.get("s1").expect("handle present");
        assert_eq!(fetched.session_id(), "s1");
        assert_eq!(fetched.connection_id(), "c1");

        assert!(registry.clear("s1"));
        assert!(registry.get("s1").is_none());
        assert!(!registry.clear("s1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn distinct_sessions_hold_independent_entries() {
        let registry = SessionRegistry::new();
        registry.insert(spawn_cat_handle("s1", "c1").await);
        registry.insert(spawn_cat_handle("s2", "c2").await);

        assert_eq!(registry.len(), 2);
        registry.clear("s1");
        assert!(registry.contains("s2"));
    }

    #[cfg(unix)]
    async fn spawn_cat_handle(session_id: &str, connection_id: &str) -> Arc<ShellHandle> {
        let mut child = tokio::process::Command::new("cat")
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .expect("spawn cat");
        let stdin = child.stdin.take().expect("piped stdin");
        // Let the child die with the test process; these tests never wait it.
        Arc::new(ShellHandle::new(
            session_id.to_string(),
            connection_id.to_string(),
            child.id(),
            stdin,
        ))
    }
}
