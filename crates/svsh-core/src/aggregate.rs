use std::collections::BTreeMap;

use crate::types::{Snapshot, StatusRow};

/// Splits `worker-3` into `("worker", 3)`. Names without a positive numeric suffix return `None`.
pub fn family_of(name: &str) -> Option<(&str, u64)> {
	let (prefix, suffix) = name.rsplit_once('-')?;
	if prefix.is_empty() || suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	suffix.parse::<u64>().ok().filter(|n| *n > 0).map(|n| (prefix, n))
}

/// Turns a snapshot into display rows, folding numbered families when `collapse` is set.
pub fn aggregate(snapshot: &Snapshot, collapse: bool) -> Vec<StatusRow> {
	if !collapse {
		return snapshot.values().map(StatusRow::from).collect();
	}

	let mut rows: Vec<StatusRow> = Vec::new();
	let mut families: BTreeMap<&str, Family> = BTreeMap::new();

	for service in snapshot.values() {
		match family_of(&service.name) {
			Some((prefix, _)) => {
				let family = families.entry(prefix).or_default();
				*family.counts.entry(service.state.to_string()).or_insert(0) += 1;
				family.duration = family.duration.max(service.duration);
			}
			None => rows.push(StatusRow::from(service)),
		}
	}

	for (prefix, family) in families {
		// A standalone service named like the family keeps its name; the family row is marked.
		let name = if snapshot.contains_key(prefix) {
			format!("{}-*", prefix)
		} else {
			prefix.to_string()
		};
		let status = family
			.counts
			.iter()
			.map(|(state, count)| format!("{} {}", count, state))
			.collect::<Vec<_>>()
			.join(", ");
		rows.push(StatusRow {
			name,
			status,
			pid: "-".to_string(),
			duration: family.duration,
		});
	}

	rows.sort_by(|a, b| a.name.cmp(&b.name));
	rows
}

#[derive(Default)]
struct Family {
	counts: BTreeMap<String, usize>,
	duration: u64,
}
