use std::str::FromStr;

use nix::sys::signal::Signal;

use crate::error::{CommandError, CommandResult};

/// Signal names accepted by `signal`, without the `SIG` prefix. Also used for completion.
pub const SIGNAL_NAMES: &[&str] = &[
	"ABRT", "ALRM", "BUS", "CHLD", "CONT", "FPE", "HUP", "ILL", "INT", "KILL", "PIPE", "PROF",
	"QUIT", "SEGV", "STOP", "SYS", "TERM", "TRAP", "TSTP", "TTIN", "TTOU", "URG", "USR1",
	"USR2", "VTALRM", "WINCH", "XCPU", "XFSZ",
];

/// Normalizes `term`, `TERM`, `sigterm` and `SIGTERM` to the same signal.
pub fn normalize(input: &str) -> CommandResult<Signal> {
	let upper = input.trim().to_ascii_uppercase();
	let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
	if !SIGNAL_NAMES.contains(&bare) {
		return Err(CommandError::UnknownSignal(input.to_string()));
	}
	Signal::from_str(&format!("SIG{}", bare))
		.map_err(|_| CommandError::UnknownSignal(input.to_string()))
}

/// `SIGTERM` -> `TERM`
pub fn short_name(sig: Signal) -> &'static str {
	let full = sig.as_str();
	full.strip_prefix("SIG").unwrap_or(full)
}
