//! data structures of the merged view served by the api
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// a single alert as part of an [AlertGroup]
pub struct GroupAlert {
	/// alertmanager assigned fingerprint, unique per label set
	pub fingerprint: String,
	pub labels: BTreeMap<String, String>,
	pub annotations: BTreeMap<String, String>,
	pub starts_at: DateTime<Utc>,
	pub receiver: String,
	/// names of all upstreams reporting this alert
	pub alertmanager: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
/// labels and annotations every alert of a group has in common
pub struct Shared {
	pub labels: BTreeMap<String, String>,
	pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// alerts grouped by the grouping labels of an alertmanager route
pub struct AlertGroup {
	/// content hash of receiver and group key, stable for the lifetime of the group
	pub id: String,
	pub receiver: String,
	/// grouping labels
	pub labels: BTreeMap<String, String>,
	pub shared: Shared,
	pub alerts: Vec<GroupAlert>,
	/// newest `starts_at` of all alerts in this group
	pub latest_starts_at: DateTime<Utc>,
}

impl AlertGroup {
	/// Looks up a label value, first in the grouping labels, then in the shared
	/// labels and last in the labels of the first alert.
	pub fn label(&self, name: &str) -> Option<&str> {
		self.labels
			.get(name)
			.or_else(|| self.shared.labels.get(name))
			.or_else(|| self.alerts.first().and_then(|alert| alert.labels.get(name)))
			.map(String::as_str)
	}

	/// recalculate `latest_starts_at` from the member alerts
	pub fn refresh_latest_starts_at(&mut self) {
		if let Some(latest) = self.alerts.iter().map(|alert| alert.starts_at).max() {
			self.latest_starts_at = latest;
		}
	}

	/// recalculate the shared labels and annotations from the member alerts,
	/// grouping labels are never part of the shared labels
	pub fn refresh_shared(&mut self) {
		let mut alerts = self.alerts.iter();
		let first = match alerts.next() {
			Some(first) => first,
			None => {
				self.shared = Shared::default();
				return;
			}
		};

		let mut labels = first.labels.clone();
		let mut annotations = first.annotations.clone();
		for alert in alerts {
			labels.retain(|k, v| alert.labels.get(k) == Some(v));
			annotations.retain(|k, v| alert.annotations.get(k) == Some(v));
		}
		labels.retain(|k, _| !self.labels.contains_key(k));

		self.shared = Shared { labels, annotations };
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// status of a single upstream as reported to the browser
pub struct AlertmanagerApiStatus {
	pub name: String,
	/// uri with credentials masked
	pub uri: String,
	#[serde(rename = "publicURI")]
	pub public_uri: String,
	/// headers the browser has to send when talking to this upstream
	pub headers: BTreeMap<String, String>,
	/// empty if the upstream is healthy
	pub error: String,
	pub version: String,
	/// cluster fingerprint, empty if it couldn't be computed
	pub cluster: String,
	pub cluster_members: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
/// upstream health counters, `total` is always `healthy + failed`
pub struct AlertmanagerApiCounters {
	pub total: usize,
	pub healthy: usize,
	pub failed: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
/// summary of all upstreams
pub struct AlertmanagerApiSummary {
	/// in the order upstreams are configured
	pub instances: Vec<AlertmanagerApiStatus>,
	/// cluster fingerprint to member names, in first seen order
	pub clusters: IndexMap<String, Vec<String>>,
	pub counters: AlertmanagerApiCounters,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// occurrences of a single label value
pub struct LabelValueStats {
	pub value: String,
	/// `name=value`, ready to be used as a filter
	pub raw: String,
	pub hits: usize,
	pub percent: usize,
	/// sum of the percentages of all values sorted before this one
	pub offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// occurrences of all values of a label
pub struct LabelNameStats {
	pub name: String,
	pub hits: usize,
	pub values: Vec<LabelValueStats>,
}
