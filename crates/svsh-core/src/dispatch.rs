use std::io;

use crate::aggregate;
use crate::config::Session;
use crate::error::{CommandError, CommandResult};
use crate::logs::{self, LogLocator};
use crate::runner::Runner;
use crate::select;
use crate::signal;
use crate::suite::SuiteAdapter;
use crate::types::{Outcome, StatusRow};

/// Command words understood by the shell, in help order.
pub const COMMANDS: &[&str] = &[
	"status", "start", "stop", "restart", "signal", "rescan", "terminate", "toggle", "fg", "help", "quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Status,
	Start(Vec<String>),
	Stop(Vec<String>),
	Restart(Vec<String>),
	Signal(String, Vec<String>),
	Rescan,
	Terminate,
	Toggle(String),
	Fg(String),
	Help,
	Quit,
}

impl Command {
	/// Parses a command line. Blank lines yield `None`.
	pub fn parse(line: &str) -> CommandResult<Option<Command>> {
		let words: Vec<&str> = line.split_whitespace().collect();
		Self::parse_words(&words)
	}

	pub fn parse_words<S: AsRef<str>>(words: &[S]) -> CommandResult<Option<Command>> {
		let Some((first, rest)) = words.split_first() else {
			return Ok(None);
		};
		let rest: Vec<String> = rest.iter().map(|w| w.as_ref().to_string()).collect();
		let command = match first.as_ref() {
			"status" => {
				no_args(&rest, "status")?;
				Command::Status
			}
			"start" => Command::Start(some_args(rest, "start <service>...")?),
			"stop" => Command::Stop(some_args(rest, "stop <service>...")?),
			"restart" => Command::Restart(some_args(rest, "restart <service>...")?),
			"signal" => {
				let mut rest = rest.into_iter();
				let sig = rest.next().ok_or(CommandError::Usage("signal <signal> <service>..."))?;
				Command::Signal(sig, some_args(rest.collect(), "signal <signal> <service>...")?)
			}
			"rescan" => {
				no_args(&rest, "rescan")?;
				Command::Rescan
			}
			"terminate" => {
				no_args(&rest, "terminate")?;
				Command::Terminate
			}
			"toggle" => Command::Toggle(one_arg(rest, "toggle collapse")?),
			"fg" => {
				let name = one_arg(rest, "fg <service>")?;
				if name.contains('*') {
					return Err(CommandError::Usage("fg <service>"));
				}
				Command::Fg(name)
			}
			"help" | "?" => Command::Help,
			"quit" | "exit" => Command::Quit,
			other => return Err(CommandError::Unrecognized(other.to_string())),
		};
		Ok(Some(command))
	}
}

fn no_args(args: &[String], usage: &'static str) -> CommandResult<()> {
	if args.is_empty() {
		Ok(())
	} else {
		Err(CommandError::Usage(usage))
	}
}

fn some_args(args: Vec<String>, usage: &'static str) -> CommandResult<Vec<String>> {
	if args.is_empty() {
		Err(CommandError::Usage(usage))
	} else {
		Ok(args)
	}
}

fn one_arg(args: Vec<String>, usage: &'static str) -> CommandResult<String> {
	let mut args = args.into_iter();
	match (args.next(), args.next()) {
		(Some(arg), None) => Ok(arg),
		_ => Err(CommandError::Usage(usage)),
	}
}

/// What a command produced, for the shell to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
	Status(Vec<StatusRow>),
	Outcomes(Vec<Outcome>),
	Message(String),
	Help,
	/// Leave the shell, optionally after printing a message.
	Quit(Option<String>),
}

impl Reply {
	pub fn failed(&self) -> bool {
		match self {
			Reply::Outcomes(outcomes) => outcomes.iter().any(|o| !o.is_ok()),
			_ => false,
		}
	}
}

pub struct Dispatcher<R> {
	adapter: SuiteAdapter<R>,
	session: Session,
	locator: LogLocator,
}

impl<R: Runner> Dispatcher<R> {
	pub fn new(session: Session, runner: R) -> Self {
		Self {
			adapter: SuiteAdapter::new(session.suite, session.basedir.clone(), runner),
			session,
			locator: LogLocator::default(),
		}
	}

	pub fn with_locator(mut self, locator: LogLocator) -> Self {
		self.locator = locator;
		self
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn adapter(&self) -> &SuiteAdapter<R> {
		&self.adapter
	}

	/// Service names as currently present under the base directory.
	pub fn known_services(&self) -> Vec<String> {
		self.adapter.service_names()
	}

	pub fn execute_line(&mut self, line: &str) -> CommandResult<Option<Reply>> {
		match Command::parse(line)? {
			Some(command) => self.execute(command).map(Some),
			None => Ok(None),
		}
	}

	pub fn execute(&mut self, command: Command) -> CommandResult<Reply> {
		tracing::debug!(?command, "dispatching");
		match command {
			Command::Status => self.status(),
			Command::Start(patterns) => Ok(Reply::Outcomes(self.adapter.start(&self.select(&patterns)?))),
			Command::Stop(patterns) => Ok(Reply::Outcomes(self.adapter.stop(&self.select(&patterns)?))),
			Command::Restart(patterns) => Ok(Reply::Outcomes(self.adapter.restart(&self.select(&patterns)?))),
			Command::Signal(sig, patterns) => {
				signal::normalize(&sig)?;
				let names = self.select(&patterns)?;
				self.adapter.signal(&sig, &names).map(Reply::Outcomes)
			}
			Command::Rescan => self.adapter.rescan().map(Reply::Message),
			Command::Terminate => self.adapter.terminate().map(|msg| Reply::Quit(Some(msg))),
			Command::Toggle(flag) => {
				self.session.toggle(&flag)?;
				self.status()
			}
			Command::Fg(name) => self.fg(&name),
			Command::Help => Ok(Reply::Help),
			Command::Quit => Ok(Reply::Quit(None)),
		}
	}

	fn status(&self) -> CommandResult<Reply> {
		let snapshot = self.adapter.status()?;
		Ok(Reply::Status(aggregate::aggregate(&snapshot, self.session.collapse)))
	}

	fn select(&self, patterns: &[String]) -> CommandResult<Vec<String>> {
		let names = select::resolve_all(patterns, &self.known_services());
		if names.is_empty() {
			return Err(CommandError::NoMatch(patterns.join(" ")));
		}
		Ok(names)
	}

	fn fg(&self, name: &str) -> CommandResult<Reply> {
		let snapshot = self.adapter.status()?;
		let service = snapshot
			.get(name)
			.ok_or_else(|| CommandError::NoMatch(name.to_string()))?;
		let path = self
			.locator
			.locate(service)
			.ok_or_else(|| CommandError::LogUnavailable(name.to_string()))?;
		tracing::info!("following {}", path.display());
		let mut stdout = io::stdout().lock();
		logs::follow_until_interrupted(&path, &mut stdout)
			.map_err(|e| CommandError::Invocation(format!("{}: {}", path.display(), e)))?;
		Ok(Reply::Message(format!("stopped following {}", path.display())))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Overrides;
	use crate::config::FileConfig;
	use crate::suite::testing::ScriptedRunner;

	fn session(suite: &str, services: &[&str]) -> (tempfile::TempDir, Session) {
		let dir = tempfile::tempdir().unwrap();
		for name in services {
			std::fs::create_dir_all(dir.path().join(name)).unwrap();
		}
		let session = Session::resolve(
			Overrides {
				suite: Some(suite.into()),
				basedir: Some(dir.path().to_path_buf()),
				..Default::default()
			},
			FileConfig::default(),
		)
		.unwrap();
		(dir, session)
	}

	#[test]
	fn parse_arity() {
		assert_eq!(Command::parse("   "), Ok(None));
		assert_eq!(Command::parse("status"), Ok(Some(Command::Status)));
		assert_eq!(Command::parse("status x"), Err(CommandError::Usage("status")));
		assert_eq!(Command::parse("start"), Err(CommandError::Usage("start <service>...")));
		assert_eq!(
			Command::parse("signal hup web-*  cron"),
			Ok(Some(Command::Signal("hup".into(), vec!["web-*".into(), "cron".into()])))
		);
		assert!(Command::parse("signal hup").is_err());
		assert_eq!(Command::parse("toggle collapse"), Ok(Some(Command::Toggle("collapse".into()))));
		assert!(Command::parse("toggle").is_err());
		assert!(Command::parse("fg web-*").is_err());
		assert!(Command::parse("fg a b").is_err());
		assert_eq!(Command::parse("exit"), Ok(Some(Command::Quit)));
		assert_eq!(Command::parse("launch x"), Err(CommandError::Unrecognized("launch".into())));
	}

	#[test]
	fn start_unions_patterns() {
		let (_dir, session) = session("runit", &["web-1", "web-2", "cron"]);
		let mut dispatcher = Dispatcher::new(session, ScriptedRunner::default());
		let reply = dispatcher.execute_line("start web-* web-1 cron").unwrap().unwrap();
		let Reply::Outcomes(outcomes) = reply else { panic!("expected outcomes") };
		let names: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
		assert_eq!(names, vec!["web-1", "web-2", "cron"]);
		assert_eq!(dispatcher.adapter().runner().calls.borrow().len(), 3);
	}

	#[test]
	fn empty_selection_is_reported() {
		let (_dir, session) = session("s6", &["nginx"]);
		let mut dispatcher = Dispatcher::new(session, ScriptedRunner::default());
		assert_eq!(
			dispatcher.execute_line("stop apache"),
			Err(CommandError::NoMatch("apache".into()))
		);
		assert!(dispatcher.adapter().runner().calls.borrow().is_empty());
	}

	#[test]
	fn bogus_signal_runs_nothing() {
		let (_dir, session) = session("s6", &["nginx"]);
		let mut dispatcher = Dispatcher::new(session, ScriptedRunner::default());
		assert_eq!(
			dispatcher.execute_line("signal bogus nginx"),
			Err(CommandError::UnknownSignal("bogus".into()))
		);
		assert!(dispatcher.adapter().runner().calls.borrow().is_empty());
	}

	#[test]
	fn partial_failure_marks_reply_failed() {
		let (_dir, session) = session("daemontools", &["a", "b"]);
		let runner = ScriptedRunner::default()
			.reply("")
			.fail("svc: warning: unable to control b: supervise not running");
		let mut dispatcher = Dispatcher::new(session, runner);
		let reply = dispatcher.execute_line("restart *").unwrap().unwrap();
		assert!(reply.failed());
		let Reply::Outcomes(outcomes) = reply else { panic!("expected outcomes") };
		assert_eq!(outcomes[0], Outcome::ok("a", "restarted"));
		assert!(!outcomes[1].is_ok());
	}

	#[test]
	fn unsupported_operations_run_nothing() {
		let (_dir, session) = session("runit", &["nginx"]);
		let mut dispatcher = Dispatcher::new(session, ScriptedRunner::default());
		assert_eq!(
			dispatcher.execute(Command::Rescan),
			Err(CommandError::Unsupported("rescan".into(), "runit"))
		);
		assert_eq!(
			dispatcher.execute(Command::Terminate),
			Err(CommandError::Unsupported("terminate".into(), "runit"))
		);
		assert!(dispatcher.adapter().runner().calls.borrow().is_empty());
	}

	#[test]
	fn terminate_quits() {
		let (_dir, session) = session("s6", &[]);
		let mut dispatcher = Dispatcher::new(session, ScriptedRunner::default());
		assert!(matches!(dispatcher.execute(Command::Terminate), Ok(Reply::Quit(Some(_)))));
	}

	#[test]
	fn toggle_collapse_twice_restores_status() {
		let (dir, session) = session("s6", &["worker-1", "worker-2"]);
		let line = "up (pid 1) 10 seconds\n";
		let runner = ScriptedRunner::default()
			.reply(line)
			.reply(line)
			.reply(line)
			.reply(line)
			.reply(line)
			.reply(line);
		let mut dispatcher = Dispatcher::new(session, runner);

		let plain = dispatcher.execute(Command::Status).unwrap();
		let collapsed = dispatcher.execute(Command::Toggle("collapse".into())).unwrap();
		let restored = dispatcher.execute(Command::Toggle("collapse".into())).unwrap();

		let Reply::Status(rows) = &collapsed else { panic!("expected status") };
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].status, "2 up");
		assert_eq!(plain, restored);
		assert!(!dispatcher.session().collapse);
		drop(dir);
	}

	#[test]
	fn fg_without_log_is_unavailable() {
		let (_dir, session) = session("s6", &["nginx"]);
		let runner = ScriptedRunner::default().reply("up (pid 12) 4 seconds\n");
		let proc_root = tempfile::tempdir().unwrap();
		let mut dispatcher = Dispatcher::new(session, runner).with_locator(LogLocator::new(proc_root.path()));
		assert_eq!(
			dispatcher.execute(Command::Fg("nginx".into())),
			Err(CommandError::LogUnavailable("nginx".into()))
		);
	}
}
