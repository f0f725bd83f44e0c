//! data structures for deserializing incoming alertmanager notifications
//!
//! Only the fields the receiver reads are declared, everything else in the
//! payload (`status`, `commonLabels`, `externalURL`, `endsAt`, ...) is ignored.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// notification posted by an alertmanager webhook receiver
#[allow(clippy::missing_docs_in_private_items)]
pub struct Data {
	pub version: String,
	pub group_key: String,

	pub receiver: String,
	pub alerts: Vec<Alert>,
	#[serde(default)]
	pub group_labels: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
/// state of a single alert
pub enum Status {
	/// the alert condition is currently true
	Firing,
	/// the alert condition is no longer true
	Resolved,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::missing_docs_in_private_items)]
pub struct Alert {
	pub status: Status,
	#[serde(default)]
	pub labels: BTreeMap<String, String>,
	#[serde(default)]
	pub annotations: BTreeMap<String, String>,
	pub starts_at: DateTime<Utc>,
	pub fingerprint: String,
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;
	use serde_json::json;

	use super::*;

	#[test]
	fn minimal_notification_is_accepted() {
		let data: Data = serde_json::from_value(json!({
			"version": "4",
			"groupKey": "{}:{alertname=\"Down\"}",
			"receiver": "ops",
			"alerts": [{
				"status": "firing",
				"startsAt": "2022-06-01T10:00:00Z",
				"fingerprint": "abc"
			}]
		}))
		.unwrap();

		assert!(data.group_labels.is_empty());
		let alert = &data.alerts[0];
		assert_eq!(alert.status, Status::Firing);
		assert!(alert.labels.is_empty());
		assert_eq!(alert.starts_at, Utc.timestamp_opt(1654077600, 0).unwrap());
	}

	#[test]
	fn full_notification_is_accepted() {
		let data: Data = serde_json::from_value(json!({
			"version": "4",
			"groupKey": "{}:{alertname=\"Down\"}",
			"truncatedAlerts": 0,
			"receiver": "ops",
			"status": "resolved",
			"alerts": [{
				"status": "resolved",
				"labels": { "alertname": "Down" },
				"annotations": { "summary": "target down" },
				"startsAt": "2022-06-01T10:00:00Z",
				"endsAt": "2022-06-01T11:00:00Z",
				"generatorURL": "http://prometheus:9090/graph",
				"fingerprint": "abc"
			}],
			"groupLabels": { "alertname": "Down" },
			"commonLabels": { "alertname": "Down" },
			"commonAnnotations": {},
			"externalURL": "http://am1:9093"
		}))
		.unwrap();

		assert_eq!(data.alerts[0].status, Status::Resolved);
		assert_eq!(data.alerts[0].labels.get("alertname").unwrap(), "Down");
	}

	#[test]
	fn unknown_status_is_rejected() {
		let result: Result<Alert, _> = serde_json::from_value(json!({
			"status": "pending",
			"startsAt": "2022-06-01T10:00:00Z",
			"fingerprint": "abc"
		}));

		assert!(result.is_err());
	}
}
