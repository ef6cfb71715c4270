use std::collections::BTreeMap;
use std::fmt;

/// A status snapshot keyed by service name.
pub type Snapshot = BTreeMap<String, Service>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
	pub name: String,
	pub state: ServiceState,
	pub pid: Option<u32>,
	/// Seconds since the last state transition.
	pub duration: u64,
	pub log_pid: Option<u32>,
}

impl Service {
	pub fn new(name: impl Into<String>, state: ServiceState, pid: Option<u32>, duration: u64) -> Self {
		Self {
			name: name.into(),
			state,
			pid,
			duration,
			log_pid: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceState {
	Up,
	Down,
	Starting,
	Resetting,
	Unknown,
	Other(String),
}

impl ServiceState {
	pub fn as_str(&self) -> &str {
		match self {
			ServiceState::Up => "up",
			ServiceState::Down => "down",
			ServiceState::Starting => "starting",
			ServiceState::Resetting => "resetting",
			ServiceState::Unknown => "unknown",
			ServiceState::Other(s) => s,
		}
	}
}

impl fmt::Display for ServiceState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One line of `status` output, either a single service or a collapsed family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
	pub name: String,
	pub status: String,
	pub pid: String,
	pub duration: u64,
}

impl From<&Service> for StatusRow {
	fn from(service: &Service) -> Self {
		Self {
			name: service.name.clone(),
			status: service.state.to_string(),
			pid: service.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
			duration: service.duration,
		}
	}
}

/// Result of one control invocation against one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
	pub name: String,
	pub result: Result<String, String>,
}

impl Outcome {
	pub fn ok(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			result: Ok(message.into()),
		}
	}

	pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			result: Err(message.into()),
		}
	}

	pub fn is_ok(&self) -> bool {
		self.result.is_ok()
	}
}

impl fmt::Display for Outcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.result {
			Ok(msg) => write!(f, "{}: {}", self.name, msg),
			Err(msg) => write!(f, "{}: failed: {}", self.name, msg),
		}
	}
}
