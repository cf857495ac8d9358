use clap::Parser;
use moshell_cli::{cli::Cli, logging, repl};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = repl::run(cli).await {
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}
