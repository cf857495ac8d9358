//! Transcript store collaborator contract.
//!
//! A transcript is the ordered collection of logged entries representing a
//! session's observed shell output and lifecycle events. The store itself is
//! an external collaborator; the runtime only appends, queries, and
//! bulk-deletes through the [`TranscriptStore`] trait. The in-memory
//! implementation here backs tests and the CLI.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// What kind of event produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Lifecycle messages such as `shell closed 0`.
    System,
    /// A chunk from the shell's stdout stream.
    Stdout,
    /// A chunk from the shell's stderr stream.
    Stderr,
    /// An unexpected process error.
    Error,
}

/// A single timestamped transcript record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub kind: EntryKind,
    pub session_id: String,
    pub connection_id: String,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: i64,
    /// Message text, stored verbatim for stream chunks.
    pub message: String,
}

impl TranscriptEntry {
    /// Builds an entry stamped with the current time.
    pub fn now(kind: EntryKind, session_id: &str, connection_id: &str, message: String) -> Self {
        Self {
            kind,
            session_id: session_id.to_string(),
            connection_id: connection_id.to_string(),
            timestamp_ms: now_millis(),
            message,
        }
    }
}

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Append-only persistence for session transcripts.
///
/// Entries are appended during a session's life and bulk-deleted when its
/// process exits, after a short grace delay.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Appends one entry.
    async fn append(&self, entry: TranscriptEntry);

    /// Returns all entries for a session, in append order.
    async fn entries(&self, session_id: &str) -> Vec<TranscriptEntry>;

    /// Deletes every entry for a session.
    async fn delete_all(&self, session_id: &str);
}

/// In-memory transcript store.
#[derive(Default)]
pub struct MemoryTranscriptStore {
    entries: Mutex<Vec<TranscriptEntry>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn append(&self, entry: TranscriptEntry) {
        self.entries.lock().push(entry);
    }

    async fn entries(&self, session_id: &str) -> Vec<TranscriptEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }

    async fn delete_all(&self, session_id: &str) {
        self.entries.lock().retain(|e| e.session_id != session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_query_are_scoped_by_session() {
        let store = MemoryTranscriptStore::new();
        store
            .append(TranscriptEntry::now(EntryKind::Stdout, "s1", "c1", "a".into()))
            .await;
        store
            .append(TranscriptEntry::now(EntryKind::Stdout, "s2", "c1", "b".into()))
            .await;
        store
            .append(TranscriptEntry::now(EntryKind::Stderr, "s1", "c1", "c".into()))
            .await;

        let s1 = store.entries("s1").await;
        assert_eq!(s1.len(), 2);
        assert_eq!(s1[0].message, "a");
        assert_eq!(s1[1].message, "c");
        assert_eq!(store.entries("s2").await.len(), 1);
    }

    #[tokio::test]
    async fn delete_all_removes_only_the_given_session() {
        let store = MemoryTranscriptStore::new();
        store
            .append(TranscriptEntry::now(EntryKind::System, "s1", "c1", "x".into()))
            .await;
        store
            .append(TranscriptEntry::now(EntryKind::System, "s2", "c1", "y".into()))
            .await;

        store.delete_all("s1").await;
        assert!(store.entries("s1").await.is_empty());
        assert_eq!(store.entries("s2").await.len(), 1);
    }
}
