use std::ffi::OsString;
use std::path::Path;

use nix::sys::signal::Signal;

use super::{parse_pid, parse_seconds, Action, Control, Entry};
use crate::error::{CommandError, CommandResult};
use crate::runner::Runner;
use crate::types::{Service, ServiceState, Snapshot};

pub(super) fn perpctl(basedir: &Path) -> Control {
	Control::new("perpctl").arg("-b").arg(basedir)
}

pub(super) fn status<R: Runner>(runner: &R, basedir: &Path, names: &[String]) -> CommandResult<Snapshot> {
	let mut args: Vec<OsString> = vec!["-b".into(), basedir.into()];
	args.extend(names.iter().map(OsString::from));
	let inv = runner
		.run("perpstat", &args)
		.map_err(|e| CommandError::Invocation(format!("perpstat: {}", e)))?;
	Ok(parse_perpstat(&inv.stdout))
}

/// Parses `perpstat` blocks:
///
/// ```text
/// nginx: activated 4262 seconds
///   main: up 4262 seconds (pid 1312)
///    log: up 4262 seconds (pid 1311)
/// ```
pub(super) fn parse_perpstat(output: &str) -> Snapshot {
	let mut snapshot = Snapshot::new();
	let mut current: Option<&str> = None;

	for line in output.lines() {
		if line.trim().is_empty() {
			continue;
		}
		if !line.starts_with(char::is_whitespace) {
			current = None;
			let Some((name, detail)) = line.split_once(": ") else {
				tracing::debug!("skipping perpstat line: {}", line);
				continue;
			};
			if detail.starts_with("activated") {
				current = Some(name);
			} else if detail.starts_with("not activated") {
				snapshot.insert(
					name.to_string(),
					Service::new(name, ServiceState::Other("inactive".into()), None, 0),
				);
			} else {
				tracing::debug!("skipping perpstat service {}: {}", name, detail);
			}
			continue;
		}

		let Some(name) = current else { continue };
		let trimmed = line.trim_start();
		if let Some(detail) = trimmed.strip_prefix("main: ") {
			if let Some(entry) = parse_process(detail) {
				snapshot.insert(name.to_string(), entry.into_service(name));
			}
		} else if let Some(detail) = trimmed.strip_prefix("log: ") {
			if let Some(service) = snapshot.get_mut(name) {
				service.log_pid = parse_pid(detail);
			}
		}
	}
	snapshot
}

fn parse_process(detail: &str) -> Option<Entry> {
	let (word, rest) = detail.split_once(' ')?;
	let state = match word {
		"up" => ServiceState::Up,
		"down" if rest.contains("want up") => ServiceState::Starting,
		"down" => ServiceState::Down,
		"starting" => ServiceState::Starting,
		"reset" | "resetting" => ServiceState::Resetting,
		"paused" => ServiceState::Other("paused".into()),
		"exiting" => ServiceState::Other("exiting".into()),
		_ => return None,
	};
	let pid = parse_pid(rest);
	if matches!(state, ServiceState::Up) && pid.is_none() {
		return None;
	}
	Some(Entry {
		state,
		pid,
		duration: parse_seconds(rest)?,
	})
}

pub(super) fn control(basedir: &Path, name: &str, action: Action) -> Control {
	let cmd = match action {
		Action::Start => "u",
		Action::Stop => "d",
		Action::Restart => "t",
	};
	perpctl(basedir).arg(cmd).arg(name)
}

pub(super) fn signal_flag(sig: Signal) -> Option<&'static str> {
	Some(match sig {
		Signal::SIGALRM => "a",
		Signal::SIGCONT => "c",
		Signal::SIGHUP => "h",
		Signal::SIGINT => "i",
		Signal::SIGKILL => "k",
		Signal::SIGSTOP => "p",
		Signal::SIGQUIT => "q",
		Signal::SIGTERM => "t",
		Signal::SIGWINCH => "w",
		Signal::SIGUSR1 => "1",
		Signal::SIGUSR2 => "2",
		_ => return None,
	})
}
