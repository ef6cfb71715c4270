use std::ffi::OsString;
use std::path::Path;

use nix::sys::signal::Signal;

use super::{parse_pid, refine_state, Action, Control, Entry};
use crate::error::{CommandError, CommandResult};
use crate::runner::Runner;
use crate::types::{ServiceState, Snapshot};

pub(super) fn status<R: Runner>(runner: &R, basedir: &Path, names: &[String]) -> CommandResult<Snapshot> {
	let mut args: Vec<OsString> = vec!["status".into()];
	args.extend(names.iter().map(|n| basedir.join(n).into_os_string()));
	// sv exits non-zero when any one service fails; the other lines are still valid.
	let inv = runner
		.run("sv", &args)
		.map_err(|e| CommandError::Invocation(format!("sv: {}", e)))?;

	let mut snapshot = Snapshot::new();
	for line in inv.stdout.lines() {
		let Some((path, entry, log_pid)) = parse_line(line) else {
			if !line.trim().is_empty() {
				tracing::debug!("skipping sv line: {}", line);
			}
			continue;
		};
		if let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) {
			let mut service = entry.into_service(name);
			service.log_pid = log_pid;
			snapshot.insert(name.to_string(), service);
		}
	}
	Ok(snapshot)
}

/// Parses one `sv status` line:
/// `run: /etc/service/nginx: (pid 123) 45s; run: log: (pid 122) 45s`
pub(super) fn parse_line(line: &str) -> Option<(&str, Entry, Option<u32>)> {
	let (main, log) = match line.split_once("; ") {
		Some((main, log)) => (main, Some(log)),
		None => (line, None),
	};
	let (word, rest) = main.split_once(": ")?;
	let (path, detail) = rest.split_once(": ")?;
	let state = match word {
		"run" => ServiceState::Up,
		"down" => ServiceState::Down,
		"finish" => ServiceState::Resetting,
		_ => return None,
	};
	let pid = parse_pid(detail);
	if matches!(state, ServiceState::Up | ServiceState::Resetting) && pid.is_none() {
		return None;
	}
	let log_pid = log
		.filter(|l| l.starts_with("run: log:"))
		.and_then(parse_pid);
	Some((
		path,
		Entry {
			state: refine_state(state, detail),
			pid,
			duration: parse_short_seconds(detail)?,
		},
		log_pid,
	))
}

/// runit prints durations as `45s`.
fn parse_short_seconds(detail: &str) -> Option<u64> {
	detail
		.split_whitespace()
		.map(|w| w.trim_end_matches(','))
		.find_map(|w| w.strip_suffix('s').and_then(|n| n.parse().ok()))
}

pub(super) fn control(dir: &Path, action: Action) -> Control {
	let cmd = match action {
		Action::Start => "up",
		Action::Stop => "down",
		Action::Restart => "restart",
	};
	Control::new("sv").arg(cmd).arg(dir)
}

pub(super) fn signal_flag(sig: Signal) -> Option<&'static str> {
	Some(match sig {
		Signal::SIGSTOP => "pause",
		Signal::SIGCONT => "cont",
		Signal::SIGHUP => "hup",
		Signal::SIGALRM => "alarm",
		Signal::SIGINT => "interrupt",
		Signal::SIGQUIT => "quit",
		Signal::SIGUSR1 => "1",
		Signal::SIGUSR2 => "2",
		Signal::SIGTERM => "term",
		Signal::SIGKILL => "kill",
		_ => return None,
	})
}
