//! The read-eval-print loop bridging the terminal to one broker session.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use moshell::{
	BinaryLocator, BrokerConfig, ConnectRequest, ConnectionProfile, EntryKind, ExecuteRequest,
	MemoryResolver, MemoryTranscriptStore, ShellBroker, TranscriptStore,
};

/// How often the printer polls the transcript for new entries.
const POLL_INTERVAL: Duration = Duration::from_millis(150);

const CONNECTION_ID: &str = "default";

/// Locator that always yields the user-supplied path.
struct FixedLocator(PathBuf);

impl BinaryLocator for FixedLocator {
	fn locate(&self, _name: &str) -> moshell::moshell_runtime::Result<PathBuf> {
		Ok(self.0.clone())
	}
}

pub async fn run(cli: crate::cli::Cli) -> anyhow::Result<()> {
	let resolver = Arc::new(MemoryResolver::new());
	resolver.insert(ConnectionProfile {
		id: CONNECTION_ID.to_string(),
		host: cli.host.clone(),
		port: cli.port,
		database_name: cli.database.clone(),
		auth_source: cli.auth_source.clone(),
		tls: cli.tls,
	});

	let store: Arc<MemoryTranscriptStore> = Arc::new(MemoryTranscriptStore::new());
	let mut broker = ShellBroker::new(resolver, store.clone()).with_config(BrokerConfig {
		shell_binary: cli.shell_binary.clone(),
		..BrokerConfig::default()
	});
	if let Some(path) = &cli.shell_path {
		broker = broker.with_locator(Arc::new(FixedLocator(path.clone())));
	}

	let session_id = format!("cli-{}", std::process::id());
	let username = cli.username.clone().unwrap_or_default();
	let password = cli.password.clone().unwrap_or_default();

	let issued = broker
		.connect_to_shell(&ConnectRequest {
			connection_id: CONNECTION_ID.to_string(),
			username: username.clone(),
			password: password.clone(),
			session_id: session_id.clone(),
		})
		.await
		.context("could not start the shell session")?;
	println!("> {issued}");

	spawn_printer(store.clone(), session_id.clone());

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	while let Some(line) = lines.next_line().await? {
		let line = line.trim();
		match line {
			"" => {}
			".exit" => break,
			".clear" => broker.clear_shell(&session_id).await,
			_ => {
				broker
					.execute_shell_command(&ExecuteRequest {
						command: line.to_string(),
						connection_id: CONNECTION_ID.to_string(),
						username: username.clone(),
						password: password.clone(),
						session_id: session_id.clone(),
					})
					.await;
			}
		}
	}

	debug!(target = "moshell.cli", session_id = %session_id, "repl finished");
	Ok(())
}

/// Prints transcript entries as the relay appends them.
fn spawn_printer(store: Arc<MemoryTranscriptStore>, session_id: String) {
	tokio::spawn(async move {
		let mut printed = 0usize;
		loop {
			let entries = store.entries(&session_id).await;
			// The transcript shrinks when the close purge fires.
			if entries.len() < printed {
				printed = entries.len();
			}
			for entry in &entries[printed..] {
				match entry.kind {
					EntryKind::Stdout => print!("{}", entry.message),
					EntryKind::Stderr => eprint!("{}", entry.message),
					EntryKind::System | EntryKind::Error => {
						println!("-- {}", entry.message.trim_end());
					}
				}
			}
			if entries.len() > printed {
				let _ = std::io::stdout().flush();
			}
			printed = entries.len();
			tokio::time::sleep(POLL_INTERVAL).await;
		}
	});
}
