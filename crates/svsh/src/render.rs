use owo_colors::OwoColorize;
use svsh_core::{CommandError, Outcome, Reply, Session, StatusRow};

pub fn reply(reply: &Reply) {
	match reply {
		Reply::Status(rows) => status(rows),
		Reply::Outcomes(outcomes) => outcomes.iter().for_each(outcome),
		Reply::Message(msg) => println!("{}", msg),
		Reply::Help => help(),
		Reply::Quit(Some(msg)) => println!("{}", msg),
		Reply::Quit(None) => {}
	}
}

pub fn error(err: &CommandError) {
	eprintln!("{} {}", "error:".red().bold(), err);
}

pub fn banner(session: &Session) {
	println!(
		"{} {} {}",
		"svsh".bold(),
		session.suite.cyan(),
		session.basedir.display().dimmed()
	);
}

#[derive(Debug, PartialEq, Eq)]
enum Health {
	Up,
	Down,
	Partial,
	Other,
}

/// Classifies `up`, `down` or a collapsed summary like `2 up, 1 down`.
fn health(status: &str) -> Health {
	let states: Vec<&str> = status
		.split(", ")
		.filter_map(|part| part.split_whitespace().last())
		.collect();
	let up = states.iter().filter(|s| **s == "up").count();
	let down = states.iter().filter(|s| **s == "down").count();
	if up == states.len() && up > 0 {
		Health::Up
	} else if down == states.len() && down > 0 {
		Health::Down
	} else if states.len() > 1 || states.iter().any(|s| *s == "starting" || *s == "resetting") {
		Health::Partial
	} else {
		Health::Other
	}
}

pub fn status(rows: &[StatusRow]) {
	if rows.is_empty() {
		println!("{}", "no services".dimmed());
		return;
	}
	let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
	let status_width = rows.iter().map(|r| r.status.len()).max().unwrap_or(0);

	for row in rows {
		let padded = format!("{:<width$}", row.status, width = status_width);
		let (circle, label) = match health(&row.status) {
			Health::Up => ("●".green().to_string(), padded.green().to_string()),
			Health::Down => ("●".red().to_string(), padded.red().to_string()),
			Health::Partial => ("●".yellow().to_string(), padded.yellow().to_string()),
			Health::Other => ("○".dimmed().to_string(), padded.dimmed().to_string()),
		};
		println!(
			"{} {:<nw$} {} {:>8} {:>8}",
			circle,
			row.name,
			label,
			row.pid,
			format_duration(row.duration),
			nw = name_width
		);
	}
}

fn outcome(outcome: &Outcome) {
	match &outcome.result {
		Ok(msg) => println!("{} {}: {}", "✓".green(), outcome.name.bold(), msg),
		Err(msg) => println!("{} {}: {}", "✗".red(), outcome.name.bold(), msg.red()),
	}
}

pub fn help() {
	println!("{}", "services".cyan().bold());
	println!("  {}                        Show all services", "status".bold());
	println!("  {} <service>...            Bring services up", "start".bold());
	println!("  {} <service>...             Bring services down", "stop".bold());
	println!("  {} <service>...          Restart services", "restart".bold());
	println!("  {} <sig> <service>...     Send a signal (term, SIGHUP, usr1, ...)", "signal".bold());
	println!("  {} <service>                 Follow a service log (Ctrl-C to stop)", "fg".bold());
	println!();
	println!("{}", "supervisor".cyan().bold());
	println!("  {}                        Rescan the service directory", "rescan".bold());
	println!("  {}                     Stop the supervisor and quit", "terminate".bold());
	println!();
	println!("{}", "shell".cyan().bold());
	println!("  {} collapse              Fold name-N services into one row", "toggle".bold());
	println!("  {}                          This help", "help".bold());
	println!("  {}                          Leave the shell", "quit".bold());
	println!();
	println!("{}", "patterns".cyan().bold());
	println!("  Service arguments accept a leading or trailing {}:", "*".bold());
	println!("    restart worker-*     stop *-staging     signal hup *");
}

pub fn format_duration(secs: u64) -> String {
	if secs < 60 {
		format!("{}s", secs)
	} else if secs < 3600 {
		let m = secs / 60;
		let s = secs % 60;
		if s == 0 { format!("{}m", m) } else { format!("{}m{}s", m, s) }
	} else if secs < 86400 {
		let h = secs / 3600;
		let m = (secs % 3600) / 60;
		if m == 0 { format!("{}h", h) } else { format!("{}h{}m", h, m) }
	} else {
		let d = secs / 86400;
		let h = (secs % 86400) / 3600;
		if h == 0 { format!("{}d", d) } else { format!("{}d{}h", d, h) }
	}
}
