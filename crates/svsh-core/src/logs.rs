//! Log discovery and following for `fg`.
//!
//! The log file is found by asking the kernel which files the service's
//! logger process holds open. Only the loggers shipped with the supported
//! suites are trusted for this; any other process yields no log.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nix::fcntl::OFlag;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::suite::Suite;
use crate::types::Service;

const TAIL_LINES: usize = 10;
const TAIL_WINDOW: u64 = 64 * 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct LogLocator {
	proc_root: PathBuf,
}

impl Default for LogLocator {
	fn default() -> Self {
		Self::new("/proc")
	}
}

impl LogLocator {
	pub fn new(proc_root: impl Into<PathBuf>) -> Self {
		Self {
			proc_root: proc_root.into(),
		}
	}

	pub fn locate(&self, service: &Service) -> Option<PathBuf> {
		let Some(pid) = service.log_pid else {
			tracing::debug!("{}: no log process", service.name);
			return None;
		};
		let proc_dir = self.proc_root.join(pid.to_string());

		let tool = executable_name(&proc_dir)?;
		if !is_known_logger(&tool) {
			tracing::debug!("{}: log pid {} runs {}, not a known logger", service.name, pid, tool);
			return None;
		}

		let mut candidates: Vec<(u32, PathBuf)> = fs::read_dir(proc_dir.join("fd"))
			.ok()?
			.flatten()
			.filter_map(|entry| {
				let fd: u32 = entry.file_name().to_str()?.parse().ok()?;
				if !fs::metadata(entry.path()).ok()?.is_file() {
					return None;
				}
				if !opened_for_writing(&proc_dir, fd) {
					return None;
				}
				Some((fd, fs::read_link(entry.path()).ok()?))
			})
			.collect();
		candidates.sort_by_key(|(fd, _)| *fd);

		// Loggers keep a lock file open next to `current`.
		candidates
			.iter()
			.find(|(_, path)| path.file_name().is_some_and(|n| n == "current"))
			.or_else(|| candidates.first())
			.map(|(_, path)| path.clone())
	}
}

/// Only the loggers shipped with a supported suite may have their open files treated as a log.
pub fn is_known_logger(executable: &str) -> bool {
	Suite::ALL.iter().any(|suite| suite.log_tool() == executable)
}

fn executable_name(proc_dir: &Path) -> Option<String> {
	if let Ok(exe) = fs::read_link(proc_dir.join("exe")) {
		return exe.file_name().map(|n| n.to_string_lossy().into_owned());
	}
	fs::read_to_string(proc_dir.join("comm"))
		.ok()
		.map(|comm| comm.trim().to_string())
		.filter(|comm| !comm.is_empty())
}

fn opened_for_writing(proc_dir: &Path, fd: u32) -> bool {
	let Ok(info) = fs::read_to_string(proc_dir.join("fdinfo").join(fd.to_string())) else {
		return false;
	};
	info.lines()
		.find_map(|line| line.strip_prefix("flags:"))
		.and_then(|bits| i32::from_str_radix(bits.trim(), 8).ok())
		.map(OFlag::from_bits_truncate)
		.is_some_and(|flags| flags.intersects(OFlag::O_WRONLY | OFlag::O_RDWR | OFlag::O_APPEND))
}

/// Prints the last lines of `path`, then everything appended to it until `stop` is set.
pub fn follow<W: Write>(path: &Path, out: &mut W, stop: &AtomicBool) -> io::Result<()> {
	let mut file = File::open(path)?;
	let len = file.metadata()?.len();
	let start = tail_offset(&mut file, len, TAIL_LINES)?;
	file.seek(SeekFrom::Start(start))?;
	let mut pos = start + io::copy(&mut (&mut file).take(len - start), out)?;
	out.flush()?;

	let mut buf = [0u8; 8192];
	while !stop.load(Ordering::SeqCst) {
		let n = match file.read(&mut buf) {
			Ok(n) => n,
			Err(e) if e.kind() == io::ErrorKind::Interrupted => 0,
			Err(e) => return Err(e),
		};
		if n > 0 {
			out.write_all(&buf[..n])?;
			out.flush()?;
			pos += n as u64;
			continue;
		}
		// A shorter file means it was truncated or replaced; start over.
		if fs::metadata(path).map(|m| m.len() < pos).unwrap_or(false) {
			tracing::debug!("{} shrank, reopening", path.display());
			file = File::open(path)?;
			pos = 0;
		}
		std::thread::sleep(POLL_INTERVAL);
	}
	Ok(())
}

fn tail_offset(file: &mut File, len: u64, lines: usize) -> io::Result<u64> {
	let window = len.min(TAIL_WINDOW);
	let base = len - window;
	file.seek(SeekFrom::Start(base))?;
	let mut buf = Vec::with_capacity(window as usize);
	Read::by_ref(file).take(window).read_to_end(&mut buf)?;

	let body = buf.strip_suffix(b"\n").unwrap_or(&buf);
	let mut seen = 0;
	for (i, byte) in body.iter().enumerate().rev() {
		if *byte == b'\n' {
			seen += 1;
			if seen == lines {
				return Ok(base + i as u64 + 1);
			}
		}
	}
	Ok(base)
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_interrupt(_: nix::libc::c_int) {
	INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Routes SIGINT to [`INTERRUPTED`] while alive, restoring the previous disposition on drop.
struct InterruptGuard {
	previous: SigAction,
}

impl InterruptGuard {
	fn install() -> nix::Result<Self> {
		INTERRUPTED.store(false, Ordering::SeqCst);
		let action = SigAction::new(SigHandler::Handler(on_interrupt), SaFlags::empty(), SigSet::empty());
		// SAFETY: the handler only stores to an atomic.
		let previous = unsafe { sigaction(Signal::SIGINT, &action) }?;
		Ok(Self { previous })
	}
}

impl Drop for InterruptGuard {
	fn drop(&mut self) {
		// SAFETY: restores the disposition saved in `install`.
		if let Err(e) = unsafe { sigaction(Signal::SIGINT, &self.previous) } {
			tracing::warn!("failed to restore SIGINT handler: {}", e);
		}
	}
}

/// Follows `path` until the user presses the interrupt key. The shell keeps running afterwards.
pub fn follow_until_interrupted<W: Write>(path: &Path, out: &mut W) -> io::Result<()> {
	let _guard = InterruptGuard::install().map_err(io::Error::from)?;
	follow(path, out, &INTERRUPTED)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::ServiceState;
	use std::os::unix::fs::symlink;
	use std::sync::Arc;

	const APPEND_FLAGS: &str = "0102001";
	const READ_FLAGS: &str = "0100000";

	struct FakeProc {
		root: tempfile::TempDir,
	}

	impl FakeProc {
		fn new() -> Self {
			Self {
				root: tempfile::tempdir().unwrap(),
			}
		}

		fn process(&self, pid: u32, exe: &str) -> PathBuf {
			let dir = self.root.path().join(pid.to_string());
			fs::create_dir_all(dir.join("fd")).unwrap();
			fs::create_dir_all(dir.join("fdinfo")).unwrap();
			symlink(Path::new("/usr/bin").join(exe), dir.join("exe")).unwrap();
			dir
		}

		fn open_file(&self, pid: u32, fd: u32, name: &str, flags: &str) -> PathBuf {
			let dir = self.root.path().join(pid.to_string());
			let target = self.root.path().join("logs").join(pid.to_string()).join(name);
			fs::create_dir_all(target.parent().unwrap()).unwrap();
			fs::write(&target, "").unwrap();
			symlink(&target, dir.join("fd").join(fd.to_string())).unwrap();
			fs::write(
				dir.join("fdinfo").join(fd.to_string()),
				format!("pos:\t0\nflags:\t{}\nmnt_id:\t21\n", flags),
			)
			.unwrap();
			target
		}

		fn locator(&self) -> LogLocator {
			LogLocator::new(self.root.path())
		}
	}

	fn service_with_log(pid: Option<u32>) -> Service {
		let mut service = Service::new("nginx", ServiceState::Up, Some(10), 5);
		service.log_pid = pid;
		service
	}

	#[test]
	fn finds_writable_log_of_known_logger() {
		let proc = FakeProc::new();
		proc.process(500, "multilog");
		proc.open_file(500, 3, "lock", APPEND_FLAGS);
		let current = proc.open_file(500, 5, "current", APPEND_FLAGS);
		assert_eq!(proc.locator().locate(&service_with_log(Some(500))), Some(current));
	}

	#[test]
	fn single_writable_descriptor_is_chosen() {
		let proc = FakeProc::new();
		proc.process(600, "svlogd");
		proc.open_file(600, 0, "config", READ_FLAGS);
		let log = proc.open_file(600, 4, "nginx.log", APPEND_FLAGS);
		assert_eq!(proc.locator().locate(&service_with_log(Some(600))), Some(log));
	}

	#[test]
	fn unknown_process_is_not_trusted() {
		let proc = FakeProc::new();
		proc.process(700, "bash");
		proc.open_file(700, 1, "current", APPEND_FLAGS);
		assert_eq!(proc.locator().locate(&service_with_log(Some(700))), None);
	}

	#[test]
	fn missing_log_pid_or_process_yields_none() {
		let proc = FakeProc::new();
		assert_eq!(proc.locator().locate(&service_with_log(None)), None);
		assert_eq!(proc.locator().locate(&service_with_log(Some(999))), None);
	}

	#[test]
	fn read_only_descriptors_do_not_qualify() {
		let proc = FakeProc::new();
		proc.process(800, "s6-log");
		proc.open_file(800, 3, "current", READ_FLAGS);
		assert_eq!(proc.locator().locate(&service_with_log(Some(800))), None);
	}

	#[test]
	fn comm_is_used_when_exe_is_unreadable() {
		let proc = FakeProc::new();
		let dir = proc.process(900, "tinylog");
		fs::remove_file(dir.join("exe")).unwrap();
		fs::write(dir.join("comm"), "tinylog\n").unwrap();
		let current = proc.open_file(900, 3, "current", APPEND_FLAGS);
		assert_eq!(proc.locator().locate(&service_with_log(Some(900))), Some(current));
	}

	#[test]
	fn logger_allow_list_covers_each_suite() {
		for tool in ["multilog", "tinylog", "s6-log", "svlogd"] {
			assert!(is_known_logger(tool), "{}", tool);
		}
		assert!(!is_known_logger("bash"));
		assert!(!is_known_logger("logger"));
	}

	#[test]
	fn follow_prints_tail_when_stopped() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("current");
		let content: String = (1..=15).map(|i| format!("line {}\n", i)).collect();
		fs::write(&path, content).unwrap();

		let stop = AtomicBool::new(true);
		let mut out = Vec::new();
		follow(&path, &mut out, &stop).unwrap();
		let text = String::from_utf8(out).unwrap();
		assert!(text.starts_with("line 6\n"));
		assert!(text.ends_with("line 15\n"));
		assert_eq!(text.lines().count(), 10);
	}

	#[test]
	fn follow_streams_appended_content() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("current");
		fs::write(&path, "old\n").unwrap();

		let stop = Arc::new(AtomicBool::new(false));
		let writer = {
			let path = path.clone();
			let stop = Arc::clone(&stop);
			std::thread::spawn(move || {
				std::thread::sleep(Duration::from_millis(100));
				let mut f = fs::OpenOptions::new().append(true).open(&path).unwrap();
				f.write_all(b"new\n").unwrap();
				std::thread::sleep(Duration::from_millis(400));
				stop.store(true, Ordering::SeqCst);
			})
		};

		let mut out = Vec::new();
		follow(&path, &mut out, &stop).unwrap();
		writer.join().unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "old\nnew\n");
	}

	#[test]
	fn follow_stops_on_busy_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("current");
		fs::write(&path, "start\n").unwrap();

		let stop = Arc::new(AtomicBool::new(false));
		let done = Arc::new(AtomicBool::new(false));
		let writer = {
			let path = path.clone();
			let done = Arc::clone(&done);
			std::thread::spawn(move || {
				let mut f = fs::OpenOptions::new().append(true).open(&path).unwrap();
				while !done.load(Ordering::SeqCst) {
					f.write_all(b"busy\n").unwrap();
				}
			})
		};
		let stopper = {
			let stop = Arc::clone(&stop);
			std::thread::spawn(move || {
				std::thread::sleep(Duration::from_millis(200));
				stop.store(true, Ordering::SeqCst);
			})
		};

		let started = std::time::Instant::now();
		let mut out = Vec::new();
		follow(&path, &mut out, &stop).unwrap();
		done.store(true, Ordering::SeqCst);
		stopper.join().unwrap();
		writer.join().unwrap();
		assert!(started.elapsed() < Duration::from_secs(5));
		assert!(out.starts_with(b"start\n"));
	}

	#[test]
	fn interrupt_ends_follow_and_restores_handler() {
		use nix::sys::signal::kill;
		use nix::unistd::Pid;

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("current");
		fs::write(&path, "a\n").unwrap();

		let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
		let original = unsafe { sigaction(Signal::SIGINT, &ignore) }.unwrap();

		let interrupter = std::thread::spawn(|| {
			std::thread::sleep(Duration::from_millis(300));
			kill(Pid::this(), Signal::SIGINT).unwrap();
		});
		let mut out = Vec::new();
		let result = follow_until_interrupted(&path, &mut out);
		interrupter.join().unwrap();

		let after = unsafe { sigaction(Signal::SIGINT, &original) }.unwrap();
		assert!(result.is_ok());
		assert_eq!(String::from_utf8(out).unwrap(), "a\n");
		assert_eq!(after.handler(), SigHandler::SigIgn);
	}
}
