use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CommandError, CommandResult, ConfigError};
use crate::suite::Suite;

/// Session booleans that `toggle` can flip.
pub const TOGGLES: &[&str] = &["collapse"];

/// Optional `config.toml`; every key can be overridden by flags or the environment.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
	pub suite: Option<String>,
	pub basedir: Option<PathBuf>,
	pub bindir: Option<PathBuf>,
	#[serde(default)]
	pub collapse: bool,
}

/// Values taken from the command line and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub suite: Option<String>,
	pub basedir: Option<PathBuf>,
	pub bindir: Option<PathBuf>,
	/// `None` leaves the file's setting in place.
	pub collapse: Option<bool>,
}

/// Settings fixed at startup. Only `collapse` changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
	pub suite: Suite,
	pub basedir: PathBuf,
	pub bindir: Option<PathBuf>,
	pub collapse: bool,
}

impl Session {
	pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self, ConfigError> {
		let suite: Suite = overrides
			.suite
			.or(file.suite)
			.ok_or(ConfigError::MissingSuite)?
			.parse()?;

		let basedir = overrides
			.basedir
			.or(file.basedir)
			.unwrap_or_else(|| suite.default_basedir().to_path_buf());
		if !basedir.exists() {
			return Err(ConfigError::MissingBasedir(basedir));
		}
		if !basedir.is_dir() {
			return Err(ConfigError::InvalidBasedir(basedir));
		}

		let bindir = overrides.bindir.or(file.bindir);
		if let Some(dir) = &bindir {
			if !dir.is_dir() {
				return Err(ConfigError::InvalidBindir(dir.clone()));
			}
		}

		Ok(Self {
			suite,
			basedir,
			bindir,
			collapse: overrides.collapse.unwrap_or(file.collapse),
		})
	}

	/// Flips a named boolean and returns its new value.
	pub fn toggle(&mut self, flag: &str) -> CommandResult<bool> {
		match flag {
			"collapse" => {
				self.collapse = !self.collapse;
				Ok(self.collapse)
			}
			_ => Err(CommandError::Usage("toggle collapse")),
		}
	}
}

pub fn config_dir() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
		PathBuf::from(dir).join("svsh")
	} else if let Some(home) = home_dir() {
		home.join(".config").join("svsh")
	} else {
		PathBuf::from("/tmp/svsh/config")
	}
}

pub fn state_dir() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
		PathBuf::from(dir).join("svsh")
	} else if let Some(home) = home_dir() {
		home.join(".local").join("state").join("svsh")
	} else {
		PathBuf::from("/tmp/svsh")
	}
}

pub fn history_path() -> PathBuf {
	state_dir().join("history")
}

fn home_dir() -> Option<PathBuf> {
	std::env::var("HOME").ok().map(PathBuf::from)
}

/// Reads `path`, or `config.toml` in [`config_dir`] when none is given.
/// A missing or broken default file is not an error; an explicit one is.
pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
	let (path, explicit) = match path {
		Some(p) => (p.to_path_buf(), true),
		None => (config_dir().join("config.toml"), false),
	};
	let content = match std::fs::read_to_string(&path) {
		Ok(c) => c,
		Err(e) if explicit => {
			return Err(ConfigError::ConfigFile {
				path,
				message: e.to_string(),
			})
		}
		Err(_) => return Ok(FileConfig::default()),
	};
	match toml::from_str(&content) {
		Ok(config) => Ok(config),
		Err(e) if explicit => Err(ConfigError::ConfigFile {
			path,
			message: e.to_string(),
		}),
		Err(e) => {
			tracing::warn!("failed to parse {}: {}", path.display(), e);
			Ok(FileConfig::default())
		}
	}
}
