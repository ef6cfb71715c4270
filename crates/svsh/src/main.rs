mod prompt;
mod render;

use std::path::PathBuf;

use clap::Parser;
use owo_colors::OwoColorize;
use svsh_core::config::load_file_config;
use svsh_core::{Command, Dispatcher, Overrides, Session, SystemRunner};
use tracing_subscriber::EnvFilter;

/// Interactive shell over daemontools, perp, s6 and runit service directories.
#[derive(Debug, Parser)]
#[command(name = "svsh", version)]
struct Cli {
	/// Directory holding the service directories
	#[arg(short = 'b', long, env = "SVSH_BASE")]
	basedir: Option<PathBuf>,

	/// Supervision suite: daemontools, perp, s6 or runit
	#[arg(short = 's', long, env = "SVSH_SUITE")]
	suite: Option<String>,

	/// Directory containing the suite's programs
	#[arg(short = 'd', long)]
	bindir: Option<PathBuf>,

	/// Fold numbered services (worker-1, worker-2, ...) into one status row
	#[arg(short = 'c', long, overrides_with = "no_collapse")]
	collapse: bool,

	/// Show every service on its own row, even if the config file enables collapse
	#[arg(long, overrides_with = "collapse")]
	no_collapse: bool,

	/// Configuration file [default: $XDG_CONFIG_HOME/svsh/config.toml]
	#[arg(long)]
	config: Option<PathBuf>,

	/// Run a single command and exit, e.g. `svsh -s runit restart worker-*`
	#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
	command: Vec<String>,
}

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_env("SVSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();
	let session = match load_session(&cli) {
		Ok(session) => session,
		Err(message) => {
			eprintln!("{} {}", "error:".red().bold(), message);
			std::process::exit(1);
		}
	};
	tracing::debug!(suite = %session.suite, basedir = %session.basedir.display(), "session ready");

	let runner = SystemRunner::new(session.bindir.clone());
	let mut shell = Dispatcher::new(session, runner);

	if cli.command.is_empty() {
		prompt::interactive(&mut shell);
	} else if !run_once(&mut shell, &cli.command) {
		std::process::exit(1);
	}
}

fn load_session(cli: &Cli) -> Result<Session, String> {
	let file = load_file_config(cli.config.as_deref()).map_err(|e| e.to_string())?;
	let overrides = Overrides {
		suite: cli.suite.clone(),
		basedir: cli.basedir.clone(),
		bindir: cli.bindir.clone(),
		collapse: collapse_override(cli),
	};
	Session::resolve(overrides, file).map_err(|e| e.to_string())
}

fn collapse_override(cli: &Cli) -> Option<bool> {
	match (cli.collapse, cli.no_collapse) {
		(true, _) => Some(true),
		(_, true) => Some(false),
		_ => None,
	}
}

/// Returns false when the command failed or any target failed.
fn run_once(shell: &mut Dispatcher<SystemRunner>, words: &[String]) -> bool {
	let command = match Command::parse_words(words) {
		Ok(Some(command)) => command,
		Ok(None) => return true,
		Err(e) => {
			render::error(&e);
			return false;
		}
	};
	match shell.execute(command) {
		Ok(reply) => {
			render::reply(&reply);
			!reply.failed()
		}
		Err(e) => {
			render::error(&e);
			false
		}
	}
}
