//! # svsh-core
//!
//! One shell over four process-supervision suites: daemontools, perp, s6
//! and runit.
//!
//! The [`suite::SuiteAdapter`] turns each suite's control tools and status
//! output into the uniform [`Service`] model. On top of it sit service
//! selection ([`select`]), status aggregation ([`aggregate`]), log discovery
//! ([`logs`]) and the command dispatcher ([`dispatch`]).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use svsh_core::{Dispatcher, FileConfig, Overrides, Session, SystemRunner};
//!
//! let session = Session::resolve(
//! 	Overrides {
//! 		suite: Some("runit".into()),
//! 		..Default::default()
//! 	},
//! 	FileConfig::default(),
//! )
//! .unwrap();
//! let runner = SystemRunner::new(session.bindir.clone());
//! let mut shell = Dispatcher::new(session, runner);
//! let reply = shell.execute_line("restart worker-*").unwrap();
//! ```

pub mod aggregate;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logs;
pub mod runner;
pub mod select;
pub mod signal;
pub mod suite;
pub mod types;

pub use config::{FileConfig, Overrides, Session};
pub use dispatch::{Command, Dispatcher, Reply, COMMANDS};
pub use error::{CommandError, ConfigError};
pub use logs::LogLocator;
pub use runner::{Invocation, Runner, SystemRunner};
pub use suite::{Capabilities, Suite, SuiteAdapter};
pub use types::*;
