use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use dialoguer::{Completion, History, Input};
use svsh_core::config::{self, TOGGLES};
use svsh_core::signal::SIGNAL_NAMES;
use svsh_core::{select, Command, Dispatcher, Reply, Runner, COMMANDS};

use crate::render;

const HISTORY_LIMIT: usize = 500;

/// Runs the read-eval loop until `quit`, `terminate` or end of input.
pub fn interactive<R: Runner>(shell: &mut Dispatcher<R>) {
	render::banner(shell.session());
	show(shell.execute(Command::Status).map(Some));

	if !io::stdin().is_terminal() {
		// Piped input: no prompt, no history.
		for line in io::stdin().lock().lines() {
			let Ok(line) = line else { break };
			if !handle(shell, &line) {
				break;
			}
		}
		return;
	}

	let mut history = FileHistory::load(config::history_path(), HISTORY_LIMIT);
	loop {
		let completion = ShellCompletion::new(shell.known_services());
		let line = Input::<String>::new()
			.with_prompt(shell.session().suite.to_string())
			.allow_empty(true)
			.history_with(&mut history)
			.completion_with(&completion)
			.interact_text();
		let line = match line {
			Ok(line) => line,
			Err(e) => {
				tracing::debug!("input closed: {}", e);
				break;
			}
		};
		if !handle(shell, &line) {
			break;
		}
	}
}

/// Executes one line. Returns false when the shell should exit.
fn handle<R: Runner>(shell: &mut Dispatcher<R>, line: &str) -> bool {
	let result = shell.execute_line(line);
	let quit = matches!(result, Ok(Some(Reply::Quit(_))));
	show(result);
	!quit
}

fn show(result: svsh_core::error::CommandResult<Option<Reply>>) {
	match result {
		Ok(Some(reply)) => render::reply(&reply),
		Ok(None) => {}
		Err(e) => render::error(&e),
	}
}

/// Line history persisted to a file, newest entry first in memory.
pub struct FileHistory {
	path: PathBuf,
	entries: VecDeque<String>,
	limit: usize,
}

impl FileHistory {
	pub fn load(path: PathBuf, limit: usize) -> Self {
		let entries = std::fs::read_to_string(&path)
			.map(|content| {
				content
					.lines()
					.rev()
					.filter(|l| !l.trim().is_empty())
					.take(limit)
					.map(String::from)
					.collect()
			})
			.unwrap_or_default();
		Self { path, entries, limit }
	}

	fn save(&self) -> io::Result<()> {
		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let mut content = String::new();
		for entry in self.entries.iter().rev() {
			content.push_str(entry);
			content.push('\n');
		}
		std::fs::write(&self.path, content)
	}
}

impl<T: ToString> History<T> for FileHistory {
	fn read(&self, pos: usize) -> Option<String> {
		self.entries.get(pos).cloned()
	}

	fn write(&mut self, val: &T) {
		let line = val.to_string();
		if line.trim().is_empty() || self.entries.front() == Some(&line) {
			return;
		}
		self.entries.push_front(line);
		self.entries.truncate(self.limit);
		if let Err(e) = self.save() {
			tracing::warn!("failed to save history to {}: {}", self.path.display(), e);
		}
	}
}

/// Tab completion for command words, service names, signals and toggles.
pub struct ShellCompletion {
	services: Vec<String>,
}

impl ShellCompletion {
	pub fn new(services: Vec<String>) -> Self {
		Self { services }
	}

	fn candidates(&self, head: &[&str], word: &str) -> Vec<String> {
		let Some(command) = head.first() else {
			return starting_with(COMMANDS, word);
		};
		match *command {
			"signal" if head.len() == 1 => {
				let upper = word.to_ascii_uppercase();
				let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
				starting_with(SIGNAL_NAMES, bare)
			}
			"start" | "stop" | "restart" | "signal" => select::resolve(&format!("{}*", word), &self.services),
			"fg" if head.len() == 1 => select::resolve(&format!("{}*", word), &self.services),
			"toggle" if head.len() == 1 => starting_with(TOGGLES, word),
			_ => Vec::new(),
		}
	}
}

impl Completion for ShellCompletion {
	fn get(&self, input: &str) -> Option<String> {
		let words: Vec<&str> = input.split(' ').collect();
		let (word, head) = words.split_last()?;
		let head: Vec<&str> = head.iter().copied().filter(|w| !w.is_empty()).collect();
		let candidates = self.candidates(&head, word);
		let completed = common_prefix(&candidates)?;

		let mut line = head.join(" ");
		if !line.is_empty() {
			line.push(' ');
		}
		line.push_str(&completed);
		if candidates.len() == 1 {
			line.push(' ');
		}
		Some(line)
	}
}

fn starting_with(words: &[&str], prefix: &str) -> Vec<String> {
	words
		.iter()
		.filter(|w| w.starts_with(prefix))
		.map(|w| w.to_string())
		.collect()
}

fn common_prefix(candidates: &[String]) -> Option<String> {
	let first = candidates.first()?;
	let mut len = first.len();
	for other in &candidates[1..] {
		len = len.min(
			first
				.char_indices()
				.zip(other.chars())
				.find(|((_, a), b)| a != b)
				.map(|((i, _), _)| i)
				.unwrap_or(first.len().min(other.len())),
		);
	}
	Some(first[..len].to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn completion() -> ShellCompletion {
		ShellCompletion::new(vec!["nginx".into(), "worker-1".into(), "worker-2".into()])
	}

	#[test]
	fn completes_command_words() {
		let c = completion();
		assert_eq!(c.get("resc"), Some("rescan ".into()));
		assert_eq!(c.get("st"), Some("st".into()));
		assert_eq!(c.get("xyz"), None);
	}

	#[test]
	fn completes_service_arguments() {
		let c = completion();
		assert_eq!(c.get("restart ng"), Some("restart nginx ".into()));
		assert_eq!(c.get("stop nginx wo"), Some("stop nginx worker-".into()));
		assert_eq!(c.get("fg worker-2"), Some("fg worker-2 ".into()));
	}

	#[test]
	fn completes_signals_and_toggles() {
		let c = completion();
		assert_eq!(c.get("signal us"), Some("signal USR".into()));
		assert_eq!(c.get("signal sigte"), Some("signal TERM ".into()));
		assert_eq!(c.get("toggle c"), Some("toggle collapse ".into()));
	}

	#[test]
	fn history_persists_newest_last_on_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("state").join("history");
		let mut history = FileHistory::load(path.clone(), 2);
		History::<String>::write(&mut history, &"status".to_string());
		History::<String>::write(&mut history, &"status".to_string());
		History::<String>::write(&mut history, &"stop nginx".to_string());
		History::<String>::write(&mut history, &"start nginx".to_string());
		assert_eq!(History::<String>::read(&history, 0), Some("start nginx".into()));
		assert_eq!(std::fs::read_to_string(&path).unwrap(), "stop nginx\nstart nginx\n");

		let reloaded = FileHistory::load(path, 2);
		assert_eq!(History::<String>::read(&reloaded, 1), Some("stop nginx".into()));
	}
}
