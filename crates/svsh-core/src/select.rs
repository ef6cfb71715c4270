//! Resolution of service arguments against the known service names.
//!
//! A pattern is either a literal name or a glob whose `*` sits at the start,
//! the end, or both ends. An interior `*` is matched literally.

/// Resolves one pattern. Results keep the order of `known`.
pub fn resolve<S: AsRef<str>>(pattern: &str, known: &[S]) -> Vec<String> {
	let glob = Glob::parse(pattern);
	known
		.iter()
		.map(AsRef::as_ref)
		.filter(|name| glob.matches(name))
		.map(str::to_string)
		.collect()
}

/// Resolves every pattern and unions the results in first-seen order.
pub fn resolve_all<S: AsRef<str>>(patterns: &[String], known: &[S]) -> Vec<String> {
	let mut selected: Vec<String> = Vec::new();
	for pattern in patterns {
		for name in resolve(pattern, known) {
			if !selected.contains(&name) {
				selected.push(name);
			}
		}
	}
	selected
}

#[derive(Debug, PartialEq, Eq)]
enum Glob<'a> {
	Any,
	Exact(&'a str),
	Prefix(&'a str),
	Suffix(&'a str),
	Contains(&'a str),
}

impl<'a> Glob<'a> {
	fn parse(pattern: &'a str) -> Self {
		if pattern.is_empty() {
			return Glob::Any;
		}
		let leading = pattern.starts_with('*');
		let trailing = pattern.len() > 1 && pattern.ends_with('*');
		let start = usize::from(leading);
		let end = pattern.len() - usize::from(trailing);
		let core = if start <= end { &pattern[start..end] } else { "" };
		match (leading, trailing) {
			_ if core.is_empty() && (leading || trailing) => Glob::Any,
			(false, false) => Glob::Exact(core),
			(false, true) => Glob::Prefix(core),
			(true, false) => Glob::Suffix(core),
			(true, true) => Glob::Contains(core),
		}
	}

	fn matches(&self, name: &str) -> bool {
		match self {
			Glob::Any => true,
			Glob::Exact(core) => name == *core,
			Glob::Prefix(core) => name.starts_with(core),
			Glob::Suffix(core) => name.ends_with(core),
			Glob::Contains(core) => name.contains(core),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn known() -> Vec<String> {
		["nginx", "postgres", "worker-1", "worker-2", "worker-10", "cron"]
			.iter()
			.map(|s| s.to_string())
			.collect()
	}

	#[test]
	fn star_selects_everything() {
		assert_eq!(resolve("*", &known()), known());
		assert_eq!(resolve("**", &known()), known());
		assert_eq!(resolve("", &known()), known());
	}

	#[test]
	fn literal_selects_itself_or_nothing() {
		assert_eq!(resolve("nginx", &known()), vec!["nginx"]);
		assert!(resolve("apache", &known()).is_empty());
		assert!(resolve("ngin", &known()).is_empty());
	}

	#[test]
	fn anchored_globs() {
		assert_eq!(resolve("worker-*", &known()), vec!["worker-1", "worker-2", "worker-10"]);
		assert_eq!(resolve("*-1", &known()), vec!["worker-1"]);
		assert_eq!(resolve("*-1*", &known()), vec!["worker-1", "worker-10"]);
		assert_eq!(resolve("*o*", &known()), vec!["postgres", "worker-1", "worker-2", "worker-10", "cron"]);
	}

	#[test]
	fn interior_star_is_literal() {
		assert!(resolve("work*er", &known()).is_empty());
		assert_eq!(resolve("a*b", &["a*b".to_string(), "axb".to_string()]), vec!["a*b"]);
	}

	#[test]
	fn repeated_trailing_characters_do_not_widen_the_match() {
		let names = vec!["www".to_string(), "ww".to_string(), "w".to_string()];
		assert_eq!(resolve("ww*", &names), vec!["www", "ww"]);
		assert_eq!(resolve("www", &names), vec!["www"]);
	}

	#[test]
	fn union_keeps_first_seen_order() {
		let patterns = vec!["worker-2".to_string(), "worker-*".to_string(), "cron".to_string()];
		assert_eq!(
			resolve_all(&patterns, &known()),
			vec!["worker-2", "worker-1", "worker-10", "cron"]
		);
	}
}
