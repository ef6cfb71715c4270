//! Adapters over the four supervision suites.
//!
//! Every suite fixes its control binaries, its status encoding and which
//! supervisor-wide operations it offers. [`SuiteAdapter`] hides all of that
//! behind one set of operations returning the uniform [`Service`] model.

mod daemontools;
mod perp;
mod runit;
mod s6;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nix::sys::signal::Signal;

use crate::error::{CommandError, CommandResult, ConfigError};
use crate::runner::{Invocation, Runner};
use crate::signal;
use crate::types::{Outcome, ServiceState, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suite {
	Daemontools,
	Perp,
	S6,
	Runit,
}

/// Supervisor-wide operations a suite may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
	pub rescan: bool,
	pub terminate: bool,
}

impl Suite {
	pub const ALL: [Suite; 4] = [Suite::Daemontools, Suite::Perp, Suite::S6, Suite::Runit];

	pub fn name(&self) -> &'static str {
		match self {
			Suite::Daemontools => "daemontools",
			Suite::Perp => "perp",
			Suite::S6 => "s6",
			Suite::Runit => "runit",
		}
	}

	pub fn default_basedir(&self) -> &'static Path {
		Path::new(match self {
			Suite::Daemontools => "/service",
			Suite::Perp => "/etc/perp",
			Suite::S6 => "/run/service",
			Suite::Runit => "/etc/service",
		})
	}

	pub fn capabilities(&self) -> Capabilities {
		match self {
			Suite::Perp | Suite::S6 => Capabilities {
				rescan: true,
				terminate: true,
			},
			Suite::Daemontools | Suite::Runit => Capabilities {
				rescan: false,
				terminate: false,
			},
		}
	}

	/// Executable name of the suite's logger.
	pub fn log_tool(&self) -> &'static str {
		match self {
			Suite::Daemontools => "multilog",
			Suite::Perp => "tinylog",
			Suite::S6 => "s6-log",
			Suite::Runit => "svlogd",
		}
	}
}

impl fmt::Display for Suite {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for Suite {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let wanted = s.trim().to_ascii_lowercase();
		Suite::ALL
			.into_iter()
			.find(|suite| suite.name() == wanted)
			.ok_or_else(|| ConfigError::UnknownSuite(s.to_string()))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	Start,
	Stop,
	Restart,
}

impl Action {
	fn done(&self) -> &'static str {
		match self {
			Action::Start => "started",
			Action::Stop => "stopped",
			Action::Restart => "restarted",
		}
	}
}

/// One control-tool call: program name plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Control {
	pub program: &'static str,
	pub args: Vec<OsString>,
}

impl Control {
	pub fn new(program: &'static str) -> Self {
		Self {
			program,
			args: Vec::new(),
		}
	}

	pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
		self.args.push(arg.into());
		self
	}
}

/// Per-service status fields parsed out of a suite's status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
	pub state: ServiceState,
	pub pid: Option<u32>,
	pub duration: u64,
}

impl Entry {
	fn into_service(self, name: &str) -> crate::types::Service {
		crate::types::Service::new(name, self.state, self.pid, self.duration)
	}
}

pub struct SuiteAdapter<R> {
	suite: Suite,
	basedir: PathBuf,
	runner: R,
}

impl<R: Runner> SuiteAdapter<R> {
	pub fn new(suite: Suite, basedir: impl Into<PathBuf>, runner: R) -> Self {
		Self {
			suite,
			basedir: basedir.into(),
			runner,
		}
	}

	pub fn suite(&self) -> Suite {
		self.suite
	}

	pub fn basedir(&self) -> &Path {
		&self.basedir
	}

	pub fn runner(&self) -> &R {
		&self.runner
	}

	/// Names of the service directories under the base directory, sorted.
	pub fn service_names(&self) -> Vec<String> {
		let entries = match std::fs::read_dir(&self.basedir) {
			Ok(e) => e,
			Err(e) => {
				tracing::warn!("cannot read {}: {}", self.basedir.display(), e);
				return Vec::new();
			}
		};
		let mut names: Vec<String> = entries
			.flatten()
			.filter(|entry| entry.path().is_dir())
			.filter_map(|entry| entry.file_name().into_string().ok())
			.filter(|name| !name.starts_with('.'))
			.collect();
		names.sort();
		names
	}

	/// Current state of every service. Services whose status cannot be read are left out.
	pub fn status(&self) -> CommandResult<Snapshot> {
		let names = self.service_names();
		if names.is_empty() {
			return Ok(Snapshot::new());
		}
		match self.suite {
			Suite::Daemontools => daemontools::status(&self.runner, &self.basedir, &names),
			Suite::Perp => perp::status(&self.runner, &self.basedir, &names),
			Suite::S6 => s6::status(&self.runner, &self.basedir, &names),
			Suite::Runit => runit::status(&self.runner, &self.basedir, &names),
		}
	}

	pub fn start(&self, names: &[String]) -> Vec<Outcome> {
		self.control(Action::Start, names)
	}

	pub fn stop(&self, names: &[String]) -> Vec<Outcome> {
		self.control(Action::Stop, names)
	}

	pub fn restart(&self, names: &[String]) -> Vec<Outcome> {
		self.control(Action::Restart, names)
	}

	pub fn control(&self, action: Action, names: &[String]) -> Vec<Outcome> {
		self.invoke_each(names, action.done(), |name| {
			let dir = self.basedir.join(name);
			match self.suite {
				Suite::Daemontools => daemontools::control(&dir, action),
				Suite::Perp => perp::control(&self.basedir, name, action),
				Suite::S6 => s6::control(&dir, action),
				Suite::Runit => runit::control(&dir, action),
			}
		})
	}

	/// Sends `sig` to every named service. Nothing runs when the signal is
	/// unknown or the suite cannot deliver it.
	pub fn signal(&self, sig: &str, names: &[String]) -> CommandResult<Vec<Outcome>> {
		let sig = signal::normalize(sig)?;
		let flag = self.signal_flag(sig).ok_or_else(|| {
			CommandError::Unsupported(format!("signal {}", sig.as_str()), self.suite.name())
		})?;
		let done = format!("sent {}", sig.as_str());
		Ok(self.invoke_each(names, &done, |name| {
			let dir = self.basedir.join(name);
			match self.suite {
				Suite::Daemontools => Control::new("svc").arg(format!("-{}", flag)).arg(dir),
				Suite::Perp => perp::perpctl(&self.basedir).arg(flag).arg(name),
				Suite::S6 => Control::new("s6-svc").arg(format!("-{}", flag)).arg(dir),
				Suite::Runit => Control::new("sv").arg(flag).arg(dir),
			}
		}))
	}

	fn signal_flag(&self, sig: Signal) -> Option<&'static str> {
		match self.suite {
			Suite::Daemontools => daemontools::signal_flag(sig),
			Suite::Perp => perp::signal_flag(sig),
			Suite::S6 => s6::signal_flag(sig),
			Suite::Runit => runit::signal_flag(sig),
		}
	}

	/// Asks the scanner to pick up added or removed service directories.
	pub fn rescan(&self) -> CommandResult<String> {
		let ctl = match self.suite {
			Suite::Perp => Control::new("perphup").arg(&self.basedir),
			Suite::S6 => Control::new("s6-svscanctl").arg("-a").arg(&self.basedir),
			Suite::Daemontools | Suite::Runit => {
				return Err(CommandError::Unsupported("rescan".into(), self.suite.name()))
			}
		};
		self.invoke_once(ctl).map(|_| format!("{}: rescanned", self.basedir.display()))
	}

	pub fn terminate(&self) -> CommandResult<String> {
		let ctl = match self.suite {
			Suite::Perp => Control::new("perphup").arg("-t").arg(&self.basedir),
			Suite::S6 => Control::new("s6-svscanctl").arg("-t").arg(&self.basedir),
			Suite::Daemontools | Suite::Runit => {
				return Err(CommandError::Unsupported("terminate".into(), self.suite.name()))
			}
		};
		self.invoke_once(ctl).map(|_| format!("{}: supervisor terminating", self.basedir.display()))
	}

	fn invoke_once(&self, ctl: Control) -> CommandResult<Invocation> {
		match self.runner.run(ctl.program, &ctl.args) {
			Ok(inv) if inv.success => Ok(inv),
			Ok(inv) => Err(CommandError::Invocation(format!("{}: {}", ctl.program, inv.failure_text()))),
			Err(e) => Err(CommandError::Invocation(format!("{}: {}", ctl.program, e))),
		}
	}

	fn invoke_each<F>(&self, names: &[String], done: &str, build: F) -> Vec<Outcome>
	where
		F: Fn(&str) -> Control,
	{
		names
			.iter()
			.map(|name| match self.invoke_once(build(name)) {
				Ok(_) => Outcome::ok(name.as_str(), done),
				Err(e) => {
					tracing::debug!(service = %name, "control failed: {}", e);
					Outcome::failed(name.as_str(), e.to_string())
				}
			})
			.collect()
	}
}

/// Extracts the number after `pid ` from text like `(pid 123)` or `(pid 123 pgid 123)`.
pub(crate) fn parse_pid(text: &str) -> Option<u32> {
	let start = text.find("pid ")? + 4;
	let digits: String = text[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
	digits.parse().ok()
}

/// Extracts `N` from the first `N seconds` in `text`.
pub(crate) fn parse_seconds(text: &str) -> Option<u64> {
	let words: Vec<&str> = text.split_whitespace().collect();
	words
		.windows(2)
		.find(|pair| pair[1].trim_end_matches(',') == "seconds")
		.and_then(|pair| pair[0].parse().ok())
}

/// Applies the flags shared by the status formats of daemontools, s6 and runit.
pub(crate) fn refine_state(base: ServiceState, detail: &str) -> ServiceState {
	match base {
		ServiceState::Up if detail.contains("paused") => ServiceState::Other("paused".into()),
		ServiceState::Down if detail.contains("want up") => ServiceState::Starting,
		other => other,
	}
}
