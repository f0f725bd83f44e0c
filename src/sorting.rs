//! Ordering of alert groups.
//!
//! Sort parameters are resolved per request, query parameters win over the
//! configured defaults. The comparators are plain functions so each step of the
//! tie-break chain can be tested on its own.
use std::{cmp::Ordering, collections::HashMap};

use serde::Deserialize;

use crate::{models::AlertGroup, natural::natural_cmp};

#[derive(Debug, Clone, Default, Deserialize)]
/// config file options for the alert grid
pub struct GridSettings {
	#[serde(default)]
	pub sorting: SortingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
/// how alert groups are ordered
pub enum SortOrder {
	/// by the newest alert of a group
	StartsAt,
	/// by the value of a label
	Label,
	/// by group id, stable across refreshes but otherwise meaningless
	Disabled,
}

impl Default for SortOrder {
	fn default() -> Self {
		SortOrder::Disabled
	}
}

impl SortOrder {
	/// Parses the `sortOrder` query parameter. Unknown values select the group
	/// id order, an empty value is treated as missing.
	pub fn from_query(value: &str) -> Option<Self> {
		match value {
			"" => None,
			"startsAt" => Some(SortOrder::StartsAt),
			"label" => Some(SortOrder::Label),
			_ => Some(SortOrder::Disabled),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
/// per label value replacements used for sorting
pub struct CustomValues {
	#[serde(default)]
	pub labels: HashMap<String, HashMap<String, String>>,
}

impl CustomValues {
	/// replacement for `value` of label `name` or `value` itself
	pub fn resolve<'a>(&'a self, name: &str, value: &'a str) -> &'a str {
		self.labels
			.get(name)
			.and_then(|values| values.get(value))
			.map_or(value, String::as_str)
	}
}

#[derive(Debug, Clone, Deserialize)]
/// configured sort defaults
pub struct SortingSettings {
	#[serde(default)]
	pub order: SortOrder,
	#[serde(default)]
	pub reverse: bool,
	#[serde(default = "default_sort_label")]
	pub label: String,
	#[serde(default)]
	pub custom_values: CustomValues,
}

fn default_sort_label() -> String {
	String::from("alertname")
}

impl Default for SortingSettings {
	fn default() -> Self {
		Self {
			order: SortOrder::default(),
			reverse: false,
			label: default_sort_label(),
			custom_values: CustomValues::default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// sort parameters of a single request
pub struct SortConfig {
	pub order: SortOrder,
	pub reverse: bool,
	pub label: String,
}

impl SortConfig {
	/// Resolves the raw `sortOrder`, `sortReverse` and `sortLabel` query
	/// parameters. Missing or malformed parameters fall back to `defaults`.
	pub fn resolve(
		defaults: &SortingSettings,
		sort_order: Option<&str>,
		sort_reverse: Option<&str>,
		sort_label: Option<&str>,
	) -> Self {
		let order = sort_order.and_then(SortOrder::from_query).unwrap_or(defaults.order);

		let reverse = match sort_reverse {
			Some("1") => true,
			Some("0") => false,
			_ => defaults.reverse,
		};

		let label = match sort_label {
			Some(label) if !label.is_empty() => label.to_string(),
			_ => defaults.label.clone(),
		};

		Self { order, reverse, label }
	}
}

/// newest first, falls back to the id so equal timestamps stay deterministic
fn cmp_newest_first(a: &AlertGroup, b: &AlertGroup) -> Ordering {
	b.latest_starts_at.cmp(&a.latest_starts_at).then_with(|| a.id.cmp(&b.id))
}

/// Compares groups by `latest_starts_at`, oldest first unless `reverse`.
pub fn cmp_starts_at(a: &AlertGroup, b: &AlertGroup, reverse: bool) -> Ordering {
	if reverse {
		cmp_newest_first(a, b)
	} else {
		a.latest_starts_at.cmp(&b.latest_starts_at).then_with(|| a.id.cmp(&b.id))
	}
}

/// Compares groups by their default order, descending ids unless `reverse`.
pub fn cmp_id(a: &AlertGroup, b: &AlertGroup, reverse: bool) -> Ordering {
	if reverse {
		a.id.cmp(&b.id)
	} else {
		b.id.cmp(&a.id)
	}
}

/// Compares two already resolved label values of two groups.
///
/// Groups without the label are moved to the end, or to the start if
/// `reverse`. Groups without the label or with equal values are ordered newest
/// first no matter what `reverse` is.
pub fn cmp_label_values(
	a: (&AlertGroup, Option<&str>),
	b: (&AlertGroup, Option<&str>),
	reverse: bool,
) -> Ordering {
	match (a.1, b.1) {
		(None, None) => cmp_newest_first(a.0, b.0),
		(None, Some(_)) if reverse => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(Some(_), None) if reverse => Ordering::Greater,
		(Some(_), None) => Ordering::Less,
		(Some(va), Some(vb)) if va == vb => cmp_newest_first(a.0, b.0),
		(Some(va), Some(vb)) if reverse => natural_cmp(vb, va),
		(Some(va), Some(vb)) => natural_cmp(va, vb),
	}
}

/// Value of label `name` for sorting, custom values are applied. Empty values
/// count as missing.
pub fn group_label<'a>(
	group: &'a AlertGroup,
	name: &str,
	custom_values: &'a CustomValues,
) -> Option<&'a str> {
	group
		.label(name)
		.map(|value| custom_values.resolve(name, value))
		.filter(|value| !value.is_empty())
}

/// Orders alert groups according to `config`. The result doesn't depend on the
/// iteration order of `groups`.
pub fn sort_alert_groups(
	groups: HashMap<String, AlertGroup>,
	config: &SortConfig,
	custom_values: &CustomValues,
) -> Vec<AlertGroup> {
	let mut groups: Vec<AlertGroup> = groups.into_values().collect();

	match config.order {
		SortOrder::StartsAt => groups.sort_by(|a, b| cmp_starts_at(a, b, config.reverse)),
		SortOrder::Label => groups.sort_by(|a, b| {
			let va = group_label(a, &config.label, custom_values);
			let vb = group_label(b, &config.label, custom_values);
			cmp_label_values((a, va), (b, vb), config.reverse)
		}),
		SortOrder::Disabled => groups.sort_by(|a, b| cmp_id(a, b, config.reverse)),
	}

	groups
}
