use std::ffi::OsString;
use std::path::Path;

use nix::sys::signal::Signal;

use super::{parse_pid, parse_seconds, refine_state, Action, Control, Entry};
use crate::error::{CommandError, CommandResult};
use crate::runner::Runner;
use crate::types::{ServiceState, Snapshot};

pub(super) fn status<R: Runner>(runner: &R, basedir: &Path, names: &[String]) -> CommandResult<Snapshot> {
	let dirs: Vec<OsString> = names.iter().map(|n| basedir.join(n).into_os_string()).collect();
	let inv = runner
		.run("svstat", &dirs)
		.map_err(|e| CommandError::Invocation(format!("svstat: {}", e)))?;

	let mut snapshot = Snapshot::new();
	for (path, entry) in parse_svstat(&inv.stdout) {
		if let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) {
			snapshot.insert(name.to_string(), entry.into_service(name));
		}
	}

	let log_dirs: Vec<OsString> = names
		.iter()
		.map(|n| basedir.join(n).join("log"))
		.filter(|dir| dir.is_dir())
		.map(|dir| dir.into_os_string())
		.collect();
	if log_dirs.is_empty() {
		return Ok(snapshot);
	}
	match runner.run("svstat", &log_dirs) {
		Ok(inv) => {
			for (path, entry) in parse_svstat(&inv.stdout) {
				let service = Path::new(path.trim_end_matches('/'))
					.parent()
					.and_then(|p| p.file_name())
					.and_then(|n| n.to_str());
				if let Some(service) = service.and_then(|name| snapshot.get_mut(name)) {
					service.log_pid = entry.pid;
				}
			}
		}
		Err(e) => tracing::debug!("svstat on log directories failed: {}", e),
	}
	Ok(snapshot)
}

/// Parses `svstat` output, one `<path>: <status>` line per directory.
pub(super) fn parse_svstat(output: &str) -> Vec<(&str, Entry)> {
	output
		.lines()
		.filter_map(|line| {
			let parsed = parse_line(line);
			if parsed.is_none() && !line.trim().is_empty() {
				tracing::debug!("skipping svstat line: {}", line);
			}
			parsed
		})
		.collect()
}

fn parse_line(line: &str) -> Option<(&str, Entry)> {
	let (path, detail) = line.split_once(": ")?;
	let detail = detail.trim();
	if detail.starts_with("supervise not running") {
		return Some((
			path,
			Entry {
				state: ServiceState::Unknown,
				pid: None,
				duration: 0,
			},
		));
	}
	let (word, rest) = detail.split_once(' ')?;
	let (state, pid) = match word {
		"up" => (ServiceState::Up, Some(parse_pid(rest)?)),
		"down" => (ServiceState::Down, None),
		_ => return None,
	};
	Some((
		path,
		Entry {
			state: refine_state(state, rest),
			pid,
			duration: parse_seconds(rest)?,
		},
	))
}

pub(super) fn control(dir: &Path, action: Action) -> Control {
	let flag = match action {
		Action::Start => "-u",
		Action::Stop => "-d",
		Action::Restart => "-t",
	};
	Control::new("svc").arg(flag).arg(dir)
}

pub(super) fn signal_flag(sig: Signal) -> Option<&'static str> {
	Some(match sig {
		Signal::SIGHUP => "h",
		Signal::SIGALRM => "a",
		Signal::SIGINT => "i",
		Signal::SIGTERM => "t",
		Signal::SIGKILL => "k",
		Signal::SIGSTOP => "p",
		Signal::SIGCONT => "c",
		_ => return None,
	})
}
