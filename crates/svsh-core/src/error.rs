use std::path::PathBuf;

use thiserror::Error;

/// Startup failures. Nothing is built when one of these occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("unknown suite '{0}' (expected one of: daemontools, perp, s6, runit)")]
	UnknownSuite(String),
	#[error("no suite given; use --suite or set SVSH_SUITE")]
	MissingSuite,
	#[error("base directory {} does not exist", .0.display())]
	MissingBasedir(PathBuf),
	#[error("base directory {} is not a directory", .0.display())]
	InvalidBasedir(PathBuf),
	#[error("binary directory {} is not a directory", .0.display())]
	InvalidBindir(PathBuf),
	#[error("failed to read {}: {message}", .path.display())]
	ConfigFile { path: PathBuf, message: String },
}

/// Per-command failures, reported inline without leaving the shell.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
	#[error("{0} is not supported by {1}")]
	Unsupported(String, &'static str),
	#[error("unknown signal '{0}'")]
	UnknownSignal(String),
	#[error("no matching service for '{0}'")]
	NoMatch(String),
	#[error("{0}")]
	Invocation(String),
	#[error("no log file found for {0}")]
	LogUnavailable(String),
	#[error("unrecognized command: {0}")]
	Unrecognized(String),
	#[error("usage: {0}")]
	Usage(&'static str),
}

pub type CommandResult<T> = Result<T, CommandError>;
