use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Captured result of one control-tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
	pub success: bool,
	pub code: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl Invocation {
	/// Best human-readable explanation of a failed invocation.
	pub fn failure_text(&self) -> String {
		let stderr = self.stderr.trim();
		if !stderr.is_empty() {
			return stderr.lines().last().unwrap_or(stderr).to_string();
		}
		let stdout = self.stdout.trim();
		if !stdout.is_empty() {
			return stdout.lines().last().unwrap_or(stdout).to_string();
		}
		match self.code {
			Some(code) => format!("exit {}", code),
			None => "killed by signal".to_string(),
		}
	}
}

/// Seam between the adapters and the operating system.
pub trait Runner {
	fn run(&self, program: &str, args: &[OsString]) -> io::Result<Invocation>;
}

/// Runs suite binaries as synchronous subprocesses.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
	bindir: Option<PathBuf>,
}

impl SystemRunner {
	pub fn new(bindir: Option<PathBuf>) -> Self {
		Self { bindir }
	}

	fn program_path(&self, program: &str) -> PathBuf {
		match &self.bindir {
			Some(dir) => dir.join(program),
			None => PathBuf::from(program),
		}
	}
}

impl Runner for SystemRunner {
	fn run(&self, program: &str, args: &[OsString]) -> io::Result<Invocation> {
		let path = self.program_path(program);
		tracing::debug!(program = %path.display(), ?args, "invoking");
		let output = Command::new(&path)
			.args(args)
			.stdin(Stdio::null())
			.output()?;
		Ok(Invocation {
			success: output.status.success(),
			code: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		})
	}
}
