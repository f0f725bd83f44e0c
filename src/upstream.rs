//! Configured alertmanager upstreams and the immutable state snapshots the
//! aggregation works on.
use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use url::Url;

use crate::models::AlertGroup;

/// error reported for upstreams that haven't sent a single notification
pub const NO_DATA_ERROR: &str = "no notifications received yet";

#[derive(Debug, Deserialize, Clone)]
/// config file options for a single upstream
pub struct UpstreamSettings {
	/// unique name of the upstream
	pub name: String,
	/// address the server talks to, may contain basic auth credentials
	pub uri: Url,
	/// address the browser talks to, defaults to `uri`
	#[serde(default)]
	pub external_uri: Option<Url>,
	/// browser requests are proxied through us, credentials stay on the server
	#[serde(default)]
	pub proxy: bool,
	/// extra headers for requests to this upstream
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
	/// names of all members of the cluster this upstream is part of
	#[serde(default)]
	pub cluster: Vec<String>,
}

impl UpstreamSettings {
	/// configured cluster members, an upstream without cluster is a cluster of one
	pub fn cluster_members(&self) -> Vec<String> {
		if self.cluster.is_empty() {
			vec![self.name.clone()]
		} else {
			self.cluster.clone()
		}
	}
}

#[derive(Debug, Clone)]
/// Everything known about an upstream at one point in time. Snapshots are
/// never modified, new state is published as a new snapshot.
pub struct UpstreamSnapshot {
	pub name: String,
	pub uri: Url,
	pub external_uri: Option<Url>,
	pub proxy: bool,
	pub headers: BTreeMap<String, String>,
	pub cluster_members: Vec<String>,
	/// empty if healthy
	pub error: String,
	pub version: String,
	/// alert groups keyed by group id
	pub groups: HashMap<String, AlertGroup>,
}

impl UpstreamSnapshot {
	/// initial state of an upstream before any notification arrived
	pub fn new(settings: &UpstreamSettings) -> Self {
		Self {
			name: settings.name.clone(),
			uri: settings.uri.clone(),
			external_uri: settings.external_uri.clone(),
			proxy: settings.proxy,
			headers: settings.headers.clone(),
			cluster_members: settings.cluster_members(),
			error: NO_DATA_ERROR.to_string(),
			version: String::new(),
			groups: HashMap::new(),
		}
	}

	/// uri with the password masked
	pub fn sanitized_uri(&self) -> String {
		sanitize_uri(&self.uri)
	}

	/// Uri the browser uses. Credentials are only included if the browser
	/// talks to the upstream directly, proxied upstreams never expose them.
	pub fn public_uri(&self) -> String {
		let uri = self.external_uri.as_ref().unwrap_or(&self.uri);
		if self.proxy {
			strip_credentials(uri)
		} else {
			uri.to_string()
		}
	}
}

/// removes username and password from a uri
pub fn strip_credentials(uri: &Url) -> String {
	let mut stripped = uri.clone();
	// both only fail for uris that can't have credentials at all
	let _ = stripped.set_username("");
	let _ = stripped.set_password(None);
	stripped.to_string()
}

/// Merges `overrides` into `headers`. Header names are case insensitive, an
/// override replaces every existing header of the same name.
pub fn merge_headers(headers: &mut BTreeMap<String, String>, overrides: &BTreeMap<String, String>) {
	for (name, value) in overrides.iter() {
		headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
		headers.insert(name.clone(), value.clone());
	}
}

/// replaces the password of a uri with `xxx`
pub fn sanitize_uri(uri: &Url) -> String {
	if uri.password().is_none() {
		return uri.to_string();
	}

	let mut sanitized = uri.clone();
	// only fails for uris that can't have credentials in the first place
	if sanitized.set_password(Some("xxx")).is_err() {
		return uri.to_string();
	}
	sanitized.to_string()
}

/// `Authorization` header for basic auth credentials embedded in a uri
pub fn headers_for_basic_auth(uri: &str) -> BTreeMap<String, String> {
	let mut headers = BTreeMap::new();

	let uri = match Url::parse(uri) {
		Ok(uri) => uri,
		Err(err) => {
			tracing::debug!("can't parse uri for basic auth credentials: {}", err);
			return headers;
		}
	};

	if uri.username().is_empty() && uri.password().is_none() {
		return headers;
	}

	let credentials = format!("{}:{}", uri.username(), uri.password().unwrap_or_default());
	headers.insert(
		"Authorization".to_string(),
		format!("Basic {}", base64::encode(credentials)),
	);

	headers
}
