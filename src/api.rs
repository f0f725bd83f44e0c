//! http api: the merged alert view and the webhook receiver
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, RawQuery},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::{merge_alert_groups, summarize_upstreams},
    alert,
    cluster::Sha256Fingerprinter,
    filters::{apply_filters, filters_from_query, Filter},
    metrics::Metrics,
    models::{AlertGroup, AlertmanagerApiSummary, LabelNameStats},
    receiver::UpstreamStore,
    settings::Settings,
    sorting::{sort_alert_groups, SortConfig, SortingSettings},
    stats::{count_label, summarize, LabelCounts},
    upstream::UpstreamSnapshot,
};

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub bind_address: IpAddr,
    pub port: u16,
}

impl ApiSettings {
    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

/// shared state of all request handlers
pub struct State {
    /// immutable configuration snapshot
    pub settings: Arc<Settings>,
    /// current snapshot of every upstream, updated by the webhook handler
    pub store: Arc<UpstreamStore>,
    /// notification and upstream health metrics
    pub(crate) metrics: Metrics,
}

/// query parameters of `/alerts.json`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AlertsQuery {
    /// every `q` parameter
    pub filters: Vec<String>,
    pub sort_order: Option<String>,
    pub sort_reverse: Option<String>,
    pub sort_label: Option<String>,
}

impl AlertsQuery {
    /// Parses a raw query string. `q` may be repeated, for every other
    /// parameter the first occurrence wins.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = Self::default();

        let raw = match raw {
            Some(raw) => raw,
            None => return query,
        };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let slot = match key.as_ref() {
                "q" => {
                    query.filters.push(value.into_owned());
                    continue;
                }
                "sortOrder" => &mut query.sort_order,
                "sortReverse" => &mut query.sort_reverse,
                "sortLabel" => &mut query.sort_label,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        query
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
/// response of `/alerts.json`
pub struct AlertsResponse {
    pub total_alerts: usize,
    pub groups: Vec<AlertGroup>,
    pub upstreams: AlertmanagerApiSummary,
    pub filters: Vec<Filter>,
    pub counters: Vec<LabelNameStats>,
}

/// Builds the merged, filtered and sorted view of all upstream snapshots.
pub fn alerts_response(
    upstreams: &[Arc<UpstreamSnapshot>],
    sorting: &SortingSettings,
    query: &AlertsQuery,
) -> AlertsResponse {
    let summary = summarize_upstreams(upstreams, &Sha256Fingerprinter);

    let groups = merge_alert_groups(upstreams);

    let (mut filters, valid) = filters_from_query(&query.filters);
    let groups = if valid {
        apply_filters(groups, &mut filters)
    } else {
        groups
    };

    let mut counts = LabelCounts::new();
    let mut total_alerts = 0;
    for group in groups.values() {
        total_alerts += group.alerts.len();
        for alert in group.alerts.iter() {
            for (name, value) in alert.labels.iter() {
                count_label(&mut counts, name, value);
            }
        }
    }

    let config = SortConfig::resolve(
        sorting,
        query.sort_order.as_deref(),
        query.sort_reverse.as_deref(),
        query.sort_label.as_deref(),
    );

    AlertsResponse {
        total_alerts,
        groups: sort_alert_groups(groups, &config, &sorting.custom_values),
        upstreams: summary,
        filters,
        counters: summarize(&counts),
    }
}

async fn alerts(
    Extension(state): Extension<Arc<State>>,
    RawQuery(raw): RawQuery,
) -> Json<AlertsResponse> {
    let query = AlertsQuery::parse(raw.as_deref());
    let upstreams = state.store.snapshot().await;

    let response = alerts_response(&upstreams, &state.settings.grid.sorting, &query);
    state.metrics.record_upstreams(&response.upstreams.counters);

    Json(response)
}

async fn webhook(
    Extension(state): Extension<Arc<State>>,
    Path(upstream): Path<String>,
    data: Result<Json<alert::Data>, JsonRejection>,
) -> StatusCode {
    let data = match data {
        Ok(Json(data)) => data,
        Err(err) => {
            tracing::debug!("failed to deserialize notification: {:?}", err);
            return StatusCode::BAD_REQUEST;
        }
    };

    match state.store.ingest(&upstream, data).await {
        Ok(()) => {
            state.metrics.record_notification(Some(&upstream));
            StatusCode::OK
        }
        Err(err) => {
            tracing::info!("rejected notification: {}", err);
            state.metrics.record_notification(None);
            StatusCode::NOT_FOUND
        }
    }
}

pub async fn run_api(state: Arc<State>) -> Result<()> {
    let addr = state.settings.listen.to_socket_addr();

    let app = Router::new()
        .route("/alerts.json", get(alerts))
        .route("/webhook/:upstream", post(webhook))
        .layer(Extension(state));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("api endpoint crashed")?;

    Ok(())
}
