//! Event relay: subprocess events -> transcript entries + registry changes.
//!
//! For every spawned shell the relay runs three pieces of work, all
//! parameterized by the owning `(session_id, connection_id)` pair:
//!
//! - relaying stdout chunks into transcript entries
//! - relaying stderr chunks into transcript entries
//! - supervising process exit, recording the close event and scheduling the
//!   transcript purge
//!
//! Per-stream ordering is preserved because each stream has its own reader
//! task; relative interleaving between stdout and stderr is not guaranteed.
//! A read failure is treated as a process error: the session is marked dead
//! even if the OS has not yet reported the exit. Error and close events may
//! both fire for one process; registry clears are idempotent so both paths
//! are safe.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::SessionRegistry;
use crate::reporter::{ErrorReporter, ReportContext};
use crate::transcript::{EntryKind, TranscriptEntry, TranscriptStore};

/// Delay between the close entry appearing and the transcript purge, so a
/// client polling the transcript can observe the closing message.
pub const DEFAULT_PURGE_DELAY: Duration = Duration::from_millis(500);

const READ_BUF_SIZE: usize = 4096;

/// Everything a relay handler needs, passed explicitly rather than captured.
#[derive(Clone)]
pub struct RelayContext {
    pub session_id: String,
    pub connection_id: String,
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<dyn TranscriptStore>,
    pub reporter: Arc<dyn ErrorReporter>,
    /// Grace delay before the session's transcript is purged after close.
    pub purge_delay: Duration,
}

impl RelayContext {
    fn report_context(&self) -> ReportContext {
        ReportContext {
            session_id: Some(self.session_id.clone()),
            connection_id: Some(self.connection_id.clone()),
            username: None,
        }
    }
}

/// Subscribes the relay to a freshly spawned shell process.
///
/// Takes exclusive ownership of the child; the returned handle resolves once
/// the process has exited and the purge has run (or an error path completed).
pub fn attach(
    ctx: RelayContext,
    child: Child,
    stdout: impl AsyncRead + Unpin + Send + 'static,
    stderr: impl AsyncRead + Unpin + Send + 'static,
) -> JoinHandle<()> {
    info!(
        target = "moshell.session",
        session_id = %ctx.session_id,
        connection_id = %ctx.connection_id,
        "shell event relay attached"
    );

    let stdout_task = tokio::spawn(relay_stream(stdout, EntryKind::Stdout, ctx.clone()));
    let stderr_task = tokio::spawn(relay_stream(stderr, EntryKind::Stderr, ctx.clone()));

    tokio::spawn(supervise(ctx, child, stdout_task, stderr_task))
}

/// Reads one stream to EOF, appending each non-empty chunk verbatim.
async fn relay_stream(
    mut reader: impl AsyncRead + Unpin,
    kind: EntryKind,
    ctx: RelayContext,
) -> std::io::Result<()> {
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        if let Some(text) = chunk_to_text(&buf[..n]) {
            debug!(
                target = "moshell.session",
                session_id = %ctx.session_id,
                kind = ?kind,
                bytes = n,
                "shell output chunk"
            );
            ctx.store
                .append(TranscriptEntry::now(
                    kind,
                    &ctx.session_id,
                    &ctx.connection_id,
                    text,
                ))
                .await;
        }
    }
}

/// Converts a raw chunk to entry text. Empty chunks (or chunks that convert
/// to an empty string) produce no entry.
fn chunk_to_text(chunk: &[u8]) -> Option<String> {
    if chunk.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(chunk).into_owned();
    if text.is_empty() { None } else { Some(text) }
}

/// Waits for both streams and the process itself, then records the outcome.
async fn supervise(
    ctx: RelayContext,
    mut child: Child,
    stdout_task: JoinHandle<std::io::Result<()>>,
    stderr_task: JoinHandle<std::io::Result<()>>,
) {
    for task in [stdout_task, stderr_task] {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => handle_error(&ctx, &err).await,
            Err(join_err) => {
                warn!(
                    target = "moshell.session",
                    session_id = %ctx.session_id,
                    error = %join_err,
                    "relay stream task failed"
                );
            }
        }
    }

    match child.wait().await {
        Ok(status) => handle_close(&ctx, status.code().unwrap_or(-1)).await,
        Err(err) => handle_wait_failure(&ctx, &err).await,
    }
}

/// A failed `wait` means no close event will ever arrive for this process,
/// so the error path must finish the lifecycle tail itself: record the
/// error, then purge the transcript after the grace delay.
async fn handle_wait_failure(ctx: &RelayContext, err: &std::io::Error) {
    handle_error(ctx, err).await;
    tokio::time::sleep(ctx.purge_delay).await;
    ctx.store.delete_all(&ctx.session_id).await;
}

/// Error event: the process is considered dead even if the OS has not yet
/// reported its exit.
async fn handle_error(ctx: &RelayContext, err: &std::io::Error) {
    ctx.reporter
        .report("shell-error", err, &ctx.report_context());
    ctx.store
        .append(TranscriptEntry::now(
            EntryKind::Error,
            &ctx.session_id,
            &ctx.connection_id,
            format!("unexpected error {err}"),
        ))
        .await;
    ctx.registry.clear(&ctx.session_id);
}

/// Close event: record the exit code, drop the handle, and purge the
/// transcript after the grace delay.
async fn handle_close(ctx: &RelayContext, code: i32) {
    info!(
        target = "moshell.session",
        session_id = %ctx.session_id,
        code = code,
        "shell closed"
    );

    ctx.store
        .append(TranscriptEntry::now(
            EntryKind::System,
            &ctx.session_id,
            &ctx.connection_id,
            format!("shell closed {code}"),
        ))
        .await;
    ctx.registry.clear(&ctx.session_id);

    tokio::time::sleep(ctx.purge_delay).await;
    ctx.store.delete_all(&ctx.session_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::TracingReporter;
    use crate::transcript::MemoryTranscriptStore;
    use tokio::io::AsyncWriteExt;

    fn test_ctx(store: Arc<MemoryTranscriptStore>) -> RelayContext {
        RelayContext {
            session_id: "s1".to_string(),
            connection_id: "c1".to_string(),
            registry: Arc::new(SessionRegistry::new()),
            store,
            reporter: Arc::new(TracingReporter),
            purge_delay: Duration::from_millis(20),
        }
    }

    #[test]
    fn empty_chunk_produces_no_text() {
        assert_eq!(chunk_to_text(b""), None);
        assert_eq!(chunk_to_text(b"{ ok: 1 }"), Some("{ ok: 1 }".to_string()));
    }

    #[tokio::test]
    async fn stream_chunks_are_appended_verbatim_in_order() {
        let store = Arc::new(MemoryTranscriptStore::new());
        let ctx = test_ctx(store.clone());

        let (reader, mut writer) = tokio::io::duplex(1024);
        let task = tokio::spawn(relay_stream(reader, EntryKind::Stdout, ctx));

        writer.write_all(b"first chunk\n").await.unwrap();
        writer.flush().await.unwrap();
        // Give the reader a chance to drain before the next chunk so the
        // two writes arrive as two reads.
        tokio::time::sleep(Duration::from_millis(10)).await;
        writer.write_all(b"second chunk\n").await.unwrap();
        drop(writer);

        task.await.unwrap().unwrap();

        let entries = store.entries("s1").await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first chunk\n");
        assert_eq!(entries[1].message, "second chunk\n");
        assert!(entries.iter().all(|e| e.kind == EntryKind::Stdout));
    }

    #[tokio::test]
    async fn stderr_chunks_carry_their_own_kind() {
        let store = Arc::new(MemoryTranscriptStore::new());
        let ctx = test_ctx(store.clone());

        let (reader, mut writer) = tokio::io::duplex(1024);
        let task = tokio::spawn(relay_stream(reader, EntryKind::Stderr, ctx));

        writer.write_all(b"boom").await.unwrap();
        drop(writer);
        task.await.unwrap().unwrap();

        let entries = store.entries("s1").await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Stderr);
        assert_eq!(entries[0].message, "boom");
    }

    #[tokio::test]
    async fn wait_failure_records_error_then_purges() {
        let store = Arc::new(MemoryTranscriptStore::new());
        let mut ctx = test_ctx(store.clone());
        ctx.purge_delay = Duration::from_millis(50);
        let registry = ctx.registry.clone();

        let err = std::io::Error::other("wait failed");
        let tail = tokio::spawn(async move { handle_wait_failure(&ctx, &err).await });

        // The error entry is visible during the grace delay.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let entries = store.entries("s1").await;
            if entries
                .iter()
                .any(|e| e.kind == EntryKind::Error && e.message.contains("unexpected error"))
            {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "error entry never appeared: {entries:?}"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!registry.contains("s1"));

        // Once the tail completes, the transcript is gone.
        tail.await.unwrap();
        assert!(store.entries("s1").await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn close_event_records_exit_code_then_purges() {
        let store = Arc::new(MemoryTranscriptStore::new());
        let ctx = test_ctx(store.clone());
        let registry = ctx.registry.clone();

        let mut child = tokio::process::Command::new("sh")
            .args(["-c", "echo hello; exit 3"])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take().unwrap();

        let relay = attach(ctx, child, stdout, stderr);

        // Wait for the supervisor to finish the whole lifecycle.
        tokio::time::timeout(Duration::from_secs(5), relay)
            .await
            .unwrap()
            .unwrap();

        // The close entry existed and was then purged after the delay.
        assert!(store.entries("s1").await.is_empty());
        assert!(!registry.contains("s1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn close_entry_is_visible_before_the_purge() {
        let store = Arc::new(MemoryTranscriptStore::new());
        let mut ctx = test_ctx(store.clone());
        ctx.purge_delay = Duration::from_secs(30);

        let mut child = tokio::process::Command::new("sh")
            .args(["-c", "exit 7"])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();
        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take().unwrap();

        let _relay = attach(ctx, child, stdout, stderr);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let entries = store.entries("s1").await;
            if entries
                .iter()
                .any(|e| e.kind == EntryKind::System && e.message == "shell closed 7")
            {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "close entry never appeared: {entries:?}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
