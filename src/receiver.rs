//! Keeps the alert state of every upstream, fed by alertmanager webhook
//! notifications.
//!
//! Each upstream's state is an immutable [UpstreamSnapshot]. A notification
//! builds a new snapshot and swaps it in, readers keep working on whatever
//! snapshots they already hold.
use std::sync::Arc;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    alert::{self, Status},
    models::{AlertGroup, GroupAlert, Shared},
    upstream::{UpstreamSettings, UpstreamSnapshot},
};

/// Error occuring when ingesting a notification
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("upstream {0:?} is not configured")]
    UnknownUpstream(String),
}

/// current snapshot of every configured upstream
#[derive(Debug)]
pub struct UpstreamStore {
    /// in configured order
    upstreams: RwLock<IndexMap<String, Arc<UpstreamSnapshot>>>,
}

impl UpstreamStore {
    pub fn new(settings: &[UpstreamSettings]) -> Self {
        let upstreams = settings
            .iter()
            .map(|settings| (settings.name.clone(), Arc::new(UpstreamSnapshot::new(settings))))
            .collect();

        Self {
            upstreams: RwLock::new(upstreams),
        }
    }

    /// snapshots of all upstreams in configured order
    pub async fn snapshot(&self) -> Vec<Arc<UpstreamSnapshot>> {
        self.upstreams.read().await.values().cloned().collect()
    }

    /// Applies a notification to the state of `upstream`.
    ///
    /// The group of the notification is replaced by the firing alerts of the
    /// notification, or removed if none of them is firing. Receiving a
    /// notification marks the upstream as healthy.
    pub async fn ingest(&self, upstream: &str, data: alert::Data) -> Result<(), IngestError> {
        let mut upstreams = self.upstreams.write().await;
        let current = upstreams
            .get_mut(upstream)
            .ok_or_else(|| IngestError::UnknownUpstream(upstream.to_string()))?;

        let mut next = (**current).clone();
        next.error.clear();
        next.version = data.version.clone();

        let id = group_id(&data.receiver, &data.group_key);
        match alert_group(id.clone(), upstream, data) {
            Some(group) => {
                tracing::debug!(
                    "upstream {} updated group {} with {} alerts",
                    upstream,
                    id,
                    group.alerts.len()
                );
                next.groups.insert(id, group);
            }
            None => {
                if next.groups.remove(&id).is_some() {
                    tracing::debug!("upstream {} resolved group {}", upstream, id);
                }
            }
        }

        *current = Arc::new(next);

        Ok(())
    }
}

/// hex encoded sha256 of receiver and group key
fn group_id(receiver: &str, group_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(receiver.as_bytes());
    hasher.update(group_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// builds the group of a notification from its firing alerts
fn alert_group(id: String, upstream: &str, data: alert::Data) -> Option<AlertGroup> {
    let receiver = data.receiver;
    let alerts: Vec<GroupAlert> = data
        .alerts
        .into_iter()
        .filter(|alert| alert.status == Status::Firing)
        .map(|alert| GroupAlert {
            fingerprint: alert.fingerprint,
            labels: alert.labels,
            annotations: alert.annotations,
            starts_at: alert.starts_at,
            receiver: receiver.clone(),
            alertmanager: vec![upstream.to_string()],
        })
        .collect();

    let latest_starts_at = alerts.iter().map(|alert| alert.starts_at).max()?;

    let mut group = AlertGroup {
        id,
        receiver,
        labels: data.group_labels,
        shared: Shared::default(),
        alerts,
        latest_starts_at,
    };
    group.refresh_shared();

    Some(group)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::upstream::NO_DATA_ERROR;

    fn settings(name: &str) -> UpstreamSettings {
        UpstreamSettings {
            name: name.to_string(),
            uri: Url::parse(&format!("http://{name}:9093")).unwrap(),
            external_uri: None,
            proxy: false,
            headers: BTreeMap::new(),
            cluster: Vec::new(),
        }
    }

    fn notification(group_key: &str, alerts: serde_json::Value) -> alert::Data {
        serde_json::from_value(json!({
            "version": "4",
            "groupKey": group_key,
            "receiver": "ops",
            "status": "firing",
            "alerts": alerts,
            "groupLabels": { "alertname": "Down" },
            "commonLabels": { "alertname": "Down" },
            "commonAnnotations": {},
            "externalURL": "http://am1:9093"
        }))
        .unwrap()
    }

    fn alert_json(fingerprint: &str, status: &str, starts_at: &str, job: &str) -> serde_json::Value {
        json!({
            "status": status,
            "labels": { "alertname": "Down", "job": job, "cluster": "prod" },
            "annotations": { "summary": "target down" },
            "startsAt": starts_at,
            "endsAt": "0001-01-01T00:00:00Z",
            "generatorURL": "http://prometheus:9090/graph",
            "fingerprint": fingerprint
        })
    }

    #[tokio::test]
    async fn upstreams_start_without_data() {
        let store = UpstreamStore::new(&[settings("am1"), settings("am2")]);
        let snapshot = store.snapshot().await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].name, "am1");
        assert_eq!(snapshot[1].name, "am2");
        assert_eq!(snapshot[0].error, NO_DATA_ERROR);
    }

    #[tokio::test]
    async fn notification_creates_group() {
        let store = UpstreamStore::new(&[settings("am1")]);
        let data = notification(
            "{}:{alertname=\"Down\"}",
            json!([
                alert_json("a", "firing", "2022-05-01T10:00:00Z", "node"),
                alert_json("b", "firing", "2022-05-01T12:00:00Z", "api"),
                alert_json("c", "resolved", "2022-05-01T13:00:00Z", "db"),
            ]),
        );

        store.ingest("am1", data).await.unwrap();

        let snapshot = store.snapshot().await;
        let am1 = &snapshot[0];
        assert_eq!(am1.error, "");
        assert_eq!(am1.version, "4");
        assert_eq!(am1.groups.len(), 1);

        let group = am1.groups.values().next().unwrap();
        assert_eq!(group.id.len(), 64);
        assert_eq!(group.alerts.len(), 2);
        assert_eq!(group.latest_starts_at, Utc.with_ymd_and_hms(2022, 5, 1, 12, 0, 0).unwrap());
        assert_eq!(group.shared.labels.get("cluster").unwrap(), "prod");
        assert!(!group.shared.labels.contains_key("alertname"));
        assert!(!group.shared.labels.contains_key("job"));
        assert_eq!(group.alerts[0].alertmanager, vec!["am1".to_string()]);
    }

    #[tokio::test]
    async fn resolved_group_is_removed() {
        let store = UpstreamStore::new(&[settings("am1")]);
        let key = "{}:{alertname=\"Down\"}";

        store
            .ingest("am1", notification(key, json!([alert_json("a", "firing", "2022-05-01T10:00:00Z", "node")])))
            .await
            .unwrap();
        let before = store.snapshot().await;

        store
            .ingest("am1", notification(key, json!([alert_json("a", "resolved", "2022-05-01T10:00:00Z", "node")])))
            .await
            .unwrap();
        let after = store.snapshot().await;

        // snapshots handed out earlier are untouched
        assert_eq!(before[0].groups.len(), 1);
        assert!(after[0].groups.is_empty());
    }

    #[tokio::test]
    async fn unknown_upstream() {
        let store = UpstreamStore::new(&[settings("am1")]);
        let data = notification("key", json!([]));

        let err = store.ingest("nope", data).await.unwrap_err();
        assert!(matches!(err, IngestError::UnknownUpstream(name) if name == "nope"));
    }

    #[test]
    fn same_group_key_same_id() {
        assert_eq!(group_id("ops", "key"), group_id("ops", "key"));
        assert_ne!(group_id("ops", "key"), group_id("dev", "key"));
    }
}
