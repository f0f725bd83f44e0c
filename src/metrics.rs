//! prometheus meters for the api

use prometheus::{opts, register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};

use crate::models::AlertmanagerApiCounters;

#[derive(Debug)]
/// prometheus meters for the webhook receiver and the aggregation
pub(crate) struct Metrics {
	/// notifications received per upstream
	notifications: IntCounterVec,
	/// number of healthy and failed upstreams seen by the last aggregation
	upstreams: IntGaugeVec,
}

impl Metrics {
	/// construct and register prometheus meters
	pub(crate) fn new() -> Result<Self, prometheus::Error> {
		let notifications = register_int_counter_vec!(
			opts!("notifications_total", "total number of deserialized notifications")
				.namespace("alertdeck")
				.subsystem("receiver"),
			&["upstream"]
		)?;

		let upstreams = register_int_gauge_vec!(
			opts!("upstreams", "number of upstreams by health").namespace("alertdeck"),
			&["state"]
		)?;

		Ok(Self { notifications, upstreams })
	}

	/// counts a notification, unknown upstreams are counted as `unknown`
	pub(crate) fn record_notification(&self, upstream: Option<&str>) {
		self.notifications.with_label_values(&[upstream.unwrap_or("unknown")]).inc();
	}

	/// records the health counters of an aggregation pass
	pub(crate) fn record_upstreams(&self, counters: &AlertmanagerApiCounters) {
		self.upstreams.with_label_values(&["healthy"]).set(counters.healthy as i64);
		self.upstreams.with_label_values(&["failed"]).set(counters.failed as i64);
	}
}
