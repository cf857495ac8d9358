use std::path::PathBuf;

use clap::Parser;

/// Interactive mongo shell sessions, brokered.
#[derive(Debug, Parser)]
#[command(name = "moshell", version, about)]
pub struct Cli {
	/// Database host to connect to.
	#[arg(long, default_value = "localhost")]
	pub host: String,

	/// Database port.
	#[arg(long, default_value_t = 27017)]
	pub port: u16,

	/// Database selected when the shell starts.
	#[arg(long, default_value = "test")]
	pub database: String,

	/// Username embedded in the connection URL.
	#[arg(long)]
	pub username: Option<String>,

	/// Password embedded in the connection URL.
	#[arg(long)]
	pub password: Option<String>,

	/// Database to authenticate against, when it differs from the target.
	#[arg(long)]
	pub auth_source: Option<String>,

	/// Connect over TLS.
	#[arg(long)]
	pub tls: bool,

	/// Explicit path to the shell binary, bypassing the system locator.
	#[arg(long)]
	pub shell_path: Option<PathBuf>,

	/// Shell binary name handed to the locator.
	#[arg(long, default_value = "mongosh")]
	pub shell_binary: String,

	/// Increase log verbosity (-v, -vv).
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}
