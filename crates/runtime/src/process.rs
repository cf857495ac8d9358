//! Shell process spawning.
//!
//! Creates the `mongosh` child process for a session with the connection URL
//! as its sole argument and all three stdio streams piped. The spawner only
//! creates the process; wiring its output into the transcript is the relay's
//! job, and registry bookkeeping belongs to the dispatcher.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::error::{Error, Result};

/// A freshly spawned shell process with its stdio split out.
///
/// `stdin` goes to the session's [`ShellHandle`](crate::ShellHandle); the
/// remaining pieces are consumed by [`relay::attach`](crate::relay::attach),
/// which takes exclusive ownership of the child for its lifetime.
pub struct ShellProcess {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Spawns the shell binary with `connection_url` as its sole argument.
///
/// The call returns as soon as the OS has created the process; it does not
/// wait for any shell output. A process that starts and then exits
/// immediately is not a spawn failure here - its exit flows through the
/// relay as a close event.
///
/// # Errors
///
/// Returns [`Error::SpawnFailed`] if the OS refuses to create the process,
/// or if any of the stdio pipes is unexpectedly missing.
pub fn spawn_shell(binary: &Path, connection_url: &str) -> Result<ShellProcess> {
    debug!(
        target = "moshell",
        binary = %binary.display(),
        "spawning shell process"
    );

    let mut child = Command::new(binary)
        .arg(connection_url)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::SpawnFailed(e.to_string()))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::SpawnFailed("child stdin pipe missing".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::SpawnFailed("child stdout pipe missing".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::SpawnFailed("child stderr pipe missing".to_string()))?;

    Ok(ShellProcess {
        child,
        stdin,
        stdout,
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_yields_all_three_pipes() {
        let mut shell = spawn_shell(Path::new("/bin/cat"), "ignored-arg").unwrap();
        // The argument names no real file, so cat exits on its own.
        let status = shell.child.wait().await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn spawn_missing_binary_is_a_spawn_failure() {
        let result = spawn_shell(Path::new("/no/such/shell/binary"), "url");
        assert!(matches!(result, Err(Error::SpawnFailed(_))));
    }
}
