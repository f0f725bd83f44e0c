//! Label value statistics for the label breakdown bars.
use std::collections::HashMap;

use crate::{
	models::{LabelNameStats, LabelValueStats},
	natural::natural_cmp,
};

/// label name to label value to number of alerts
pub type LabelCounts = HashMap<String, HashMap<String, usize>>;

/// count one more occurrence of `name=value`
pub fn count_label(counts: &mut LabelCounts, name: &str, value: &str) {
	*counts
		.entry(name.to_string())
		.or_default()
		.entry(value.to_string())
		.or_default() += 1;
}

/// Turns raw label counts into per label percentages.
///
/// Values are sorted in natural order. Percentages are floored and the
/// remainder needed to reach 100 is handed out one by one starting with the
/// first value. Each value's offset is the sum of percentages before it.
/// Labels without any hits are skipped. Labels are ordered by hits, most first,
/// then by name.
pub fn summarize(counts: &LabelCounts) -> Vec<LabelNameStats> {
	let mut stats: Vec<LabelNameStats> =
		counts.iter().filter_map(|(name, values)| summarize_label(name, values)).collect();

	stats.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.name.cmp(&b.name)));

	stats
}

fn summarize_label(name: &str, counts: &HashMap<String, usize>) -> Option<LabelNameStats> {
	let hits: usize = counts.values().sum();
	if hits == 0 {
		return None;
	}

	let mut values: Vec<LabelValueStats> = counts
		.iter()
		.map(|(value, &value_hits)| LabelValueStats {
			value: value.clone(),
			raw: format!("{name}={value}"),
			hits: value_hits,
			percent: value_hits * 100 / hits,
			offset: 0,
		})
		.collect();

	values.sort_by(|a, b| natural_cmp(&a.value, &b.value));

	// hits > 0 so there's at least one value and this terminates
	let mut total: usize = values.iter().map(|value| value.percent).sum();
	while total < 100 {
		for value in values.iter_mut() {
			if total >= 100 {
				break;
			}
			value.percent += 1;
			total += 1;
		}
	}

	let mut offset = 0;
	for value in values.iter_mut() {
		value.offset = offset;
		offset += value.percent;
	}

	Some(LabelNameStats { name: name.to_string(), hits, values })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn counts(data: &[(&str, &[(&str, usize)])]) -> LabelCounts {
		data.iter()
			.map(|(name, values)| {
				(name.to_string(), values.iter().map(|(v, h)| (v.to_string(), *h)).collect())
			})
			.collect()
	}

	fn assert_layout(stats: &LabelNameStats) {
		let total: usize = stats.values.iter().map(|v| v.percent).sum();
		assert_eq!(total, 100, "{}", stats.name);

		let mut expected_offset = 0;
		for value in stats.values.iter() {
			assert_eq!(value.offset, expected_offset);
			expected_offset += value.percent;
		}
		let last = stats.values.last().unwrap();
		assert_eq!(last.offset + last.percent, 100);
	}

	#[test]
	fn remainder_goes_to_first_value() {
		let stats = summarize(&counts(&[("severity", &[("warning", 1), ("critical", 2)])]));

		assert_eq!(stats.len(), 1);
		let severity = &stats[0];
		assert_eq!(severity.hits, 3);

		let critical = &severity.values[0];
		assert_eq!(
			(critical.value.as_str(), critical.percent, critical.offset),
			("critical", 67, 0)
		);
		assert_eq!(critical.raw, "severity=critical");

		let warning = &severity.values[1];
		assert_eq!((warning.value.as_str(), warning.percent, warning.offset), ("warning", 33, 67));
	}

	#[test]
	fn remainder_spread_over_several_values() {
		// seven values with one hit each floor to 14%, 2% are missing
		let values: Vec<(String, usize)> = (1..=7).map(|i| (format!("v{i}"), 1)).collect();
		let mut raw = LabelCounts::new();
		raw.insert("job".to_string(), values.into_iter().collect());

		let stats = summarize(&raw);
		let percents: Vec<usize> = stats[0].values.iter().map(|v| v.percent).collect();

		assert_eq!(percents, vec![15, 15, 14, 14, 14, 14, 14]);
		assert_layout(&stats[0]);
	}

	#[test]
	fn values_flooring_to_zero() {
		let stats = summarize(&counts(&[("a", &[("x", 1), ("y", 1), ("z", 99)])]));
		let percents: Vec<usize> = stats[0].values.iter().map(|v| v.percent).collect();

		assert_eq!(percents, vec![1, 1, 98]);
		assert_layout(&stats[0]);
	}

	#[test]
	fn many_values() {
		let values: Vec<(String, usize)> = (0..60).map(|i| (format!("i{i}"), 1)).collect();
		let mut raw = LabelCounts::new();
		raw.insert("instance".to_string(), values.into_iter().collect());

		let stats = summarize(&raw);

		assert_layout(&stats[0]);
		assert_eq!(stats[0].values[0].value, "i0");
		assert_eq!(stats[0].values[0].percent, 2);
		assert_eq!(stats[0].values[39].percent, 2);
		assert_eq!(stats[0].values[40].percent, 1);
		assert_eq!(stats[0].values[59].value, "i59");
	}

	#[test]
	fn values_in_natural_order() {
		let stats =
			summarize(&counts(&[("version", &[("v10", 1), ("v2", 1), ("v1", 1), ("beta", 1)])]));
		let values: Vec<&str> = stats[0].values.iter().map(|v| v.value.as_str()).collect();

		assert_eq!(values, vec!["beta", "v1", "v2", "v10"]);
		assert_layout(&stats[0]);
	}

	#[test]
	fn labels_without_hits_are_skipped() {
		let stats = summarize(&counts(&[("empty", &[("x", 0)]), ("job", &[("node", 4)])]));

		assert_eq!(stats.len(), 1);
		assert_eq!(stats[0].name, "job");
		assert_eq!(stats[0].values[0].percent, 100);
		assert!(summarize(&counts(&[("none", &[])])).is_empty());
	}

	#[test]
	fn labels_ordered_by_hits_then_name() {
		let stats = summarize(&counts(&[
			("job", &[("node", 2)]),
			("alertname", &[("Down", 5)]),
			("instance", &[("a", 1), ("b", 1)]),
		]));
		let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();

		assert_eq!(names, vec!["alertname", "instance", "job"]);
	}

	#[test]
	fn count_label_accumulates() {
		let mut counts = LabelCounts::new();
		count_label(&mut counts, "job", "node");
		count_label(&mut counts, "job", "node");
		count_label(&mut counts, "job", "api");

		assert_eq!(counts["job"]["node"], 2);
		assert_eq!(counts["job"]["api"], 1);
	}
}
