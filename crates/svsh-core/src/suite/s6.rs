use std::path::Path;

use nix::sys::signal::Signal;

use super::{parse_pid, parse_seconds, refine_state, Action, Control, Entry};
use crate::error::CommandResult;
use crate::runner::Runner;
use crate::types::{ServiceState, Snapshot};

/// `s6-svstat` takes a single directory, so each service (and its logger) is queried separately.
pub(super) fn status<R: Runner>(runner: &R, basedir: &Path, names: &[String]) -> CommandResult<Snapshot> {
	let mut snapshot = Snapshot::new();
	for name in names {
		let dir = basedir.join(name);
		let Some(entry) = svstat(runner, &dir) else {
			continue;
		};
		let mut service = entry.into_service(name);
		let log_dir = dir.join("log");
		if log_dir.is_dir() {
			service.log_pid = svstat(runner, &log_dir).and_then(|log| log.pid);
		}
		snapshot.insert(name.clone(), service);
	}
	Ok(snapshot)
}

fn svstat<R: Runner>(runner: &R, dir: &Path) -> Option<Entry> {
	let inv = match runner.run("s6-svstat", &[dir.into()]) {
		Ok(inv) if inv.success => inv,
		Ok(inv) => {
			tracing::debug!("s6-svstat {}: {}", dir.display(), inv.failure_text());
			return None;
		}
		Err(e) => {
			tracing::debug!("s6-svstat {}: {}", dir.display(), e);
			return None;
		}
	};
	parse_svstat(inv.stdout.trim())
}

/// Parses one `s6-svstat` line, e.g. `up (pid 123) 45 seconds, normally down, ready 45 seconds`.
pub(super) fn parse_svstat(line: &str) -> Option<Entry> {
	let (word, rest) = line.split_once(' ')?;
	let (state, pid) = match word {
		"up" => (ServiceState::Up, Some(parse_pid(rest)?)),
		"down" => (ServiceState::Down, None),
		_ => return None,
	};
	Some(Entry {
		state: refine_state(state, rest),
		pid,
		duration: parse_seconds(rest)?,
	})
}

pub(super) fn control(dir: &Path, action: Action) -> Control {
	let flag = match action {
		Action::Start => "-u",
		Action::Stop => "-d",
		Action::Restart => "-r",
	};
	Control::new("s6-svc").arg(flag).arg(dir)
}

pub(super) fn signal_flag(sig: Signal) -> Option<&'static str> {
	Some(match sig {
		Signal::SIGALRM => "a",
		Signal::SIGABRT => "b",
		Signal::SIGQUIT => "q",
		Signal::SIGHUP => "h",
		Signal::SIGKILL => "k",
		Signal::SIGTERM => "t",
		Signal::SIGINT => "i",
		Signal::SIGUSR1 => "1",
		Signal::SIGUSR2 => "2",
		Signal::SIGSTOP => "p",
		Signal::SIGCONT => "c",
		Signal::SIGWINCH => "y",
		_ => return None,
	})
}
