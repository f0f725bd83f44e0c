//! Combines the snapshots of all upstreams into a single view.
use std::{
	collections::{hash_map::Entry, BTreeMap, HashMap},
	sync::Arc,
};

use indexmap::IndexMap;

use crate::{
	cluster::Fingerprinter,
	models::{AlertGroup, AlertmanagerApiCounters, AlertmanagerApiStatus, AlertmanagerApiSummary},
	upstream::{headers_for_basic_auth, merge_headers, UpstreamSnapshot},
};

/// Summarizes upstream health and cluster membership.
///
/// Instances are reported in the order of `upstreams`. Upstreams sharing a
/// cluster fingerprint produce a single cluster entry holding the member list
/// of the first of them. If the fingerprint can't be computed the upstream is
/// still reported, just without a cluster.
pub fn summarize_upstreams<F: Fingerprinter>(
	upstreams: &[Arc<UpstreamSnapshot>],
	fingerprinter: &F,
) -> AlertmanagerApiSummary {
	let mut clusters: IndexMap<String, Vec<String>> = IndexMap::new();
	let mut instances = Vec::with_capacity(upstreams.len());
	let mut counters = AlertmanagerApiCounters::default();

	for upstream in upstreams.iter() {
		let members = upstream.cluster_members.clone();

		let cluster = match fingerprinter.fingerprint(&members) {
			Ok(key) => {
				clusters.entry(key.clone()).or_insert_with(|| members.clone());
				key
			}
			Err(err) => {
				tracing::error!("cluster fingerprint for upstream {} failed: {}", upstream.name, err);
				String::new()
			}
		};

		// proxied upstreams are only ever talked to by us, the browser must
		// not get our credentials, neither as headers nor in the uri
		let public_uri = upstream.public_uri();
		let headers = if upstream.proxy {
			BTreeMap::new()
		} else {
			let mut headers = headers_for_basic_auth(&public_uri);
			merge_headers(&mut headers, &upstream.headers);
			headers
		};

		counters.total += 1;
		if upstream.error.is_empty() {
			counters.healthy += 1;
		} else {
			counters.failed += 1;
		}

		instances.push(AlertmanagerApiStatus {
			name: upstream.name.clone(),
			uri: upstream.sanitized_uri(),
			public_uri,
			headers,
			error: upstream.error.clone(),
			version: upstream.version.clone(),
			cluster,
			cluster_members: members,
		});
	}

	AlertmanagerApiSummary { instances, clusters, counters }
}

/// Merges the alert groups of all upstreams.
///
/// Groups are matched by id. Alerts of matched groups are deduplicated by
/// fingerprint and remember every upstream that reported them.
pub fn merge_alert_groups(upstreams: &[Arc<UpstreamSnapshot>]) -> HashMap<String, AlertGroup> {
	let mut merged: HashMap<String, AlertGroup> = HashMap::new();

	for upstream in upstreams.iter() {
		for (id, group) in upstream.groups.iter() {
			match merged.entry(id.clone()) {
				Entry::Vacant(entry) => {
					entry.insert(group.clone());
				}
				Entry::Occupied(mut entry) => merge_group(entry.get_mut(), group),
			}
		}
	}

	merged
}

/// merge `other` into `group`
fn merge_group(group: &mut AlertGroup, other: &AlertGroup) {
	for alert in other.alerts.iter() {
		match group.alerts.iter_mut().find(|a| a.fingerprint == alert.fingerprint) {
			Some(existing) => {
				for name in alert.alertmanager.iter() {
					if !existing.alertmanager.contains(name) {
						existing.alertmanager.push(name.clone());
					}
				}
			}
			None => group.alerts.push(alert.clone()),
		}
	}

	group.refresh_latest_starts_at();
	group.refresh_shared();
}
