//! aggregates alertmanager upstreams into a single alert view
//!
//! Features:
//! - receives alertmanager webhook notifications for every configured upstream
//! - merges alert groups and coalesces upstreams belonging to the same cluster
//! - label filters, label statistics and configurable group ordering

use std::sync::Arc;

use anyhow::{Context, Result};
use settings::Settings;

use crate::{api::State, metrics::Metrics, receiver::UpstreamStore};

mod aggregate;
mod alert;
mod api;
mod cluster;
mod filters;
mod log;
mod metrics;
mod models;
mod natural;
mod receiver;
mod settings;
mod sorting;
mod stats;
mod telemetry_endpoint;
mod upstream;

/// exit the complete program if one thread panics
fn setup_panic_handler() {
	let default_panic = std::panic::take_hook();
	std::panic::set_hook(Box::new(move |info| {
		default_panic(info);
		std::process::exit(1);
	}));
}

/// the entry point of the program
#[tokio::main]
pub async fn main() -> Result<()> {
	setup_panic_handler();

	let settings = Arc::new(
		Settings::load().context("failed to load config and command line arguments")?,
	);

	log::setup_logging(&settings.log).context("could not setup logging")?;

	tracing::info!("aggregating {} upstreams", settings.upstreams.len());

	let state = Arc::new(State {
		store: Arc::new(UpstreamStore::new(&settings.upstreams)),
		metrics: Metrics::new().context("failed to register metrics")?,
		settings: Arc::clone(&settings),
	});

	futures::try_join!(
		api::run_api(state),
		telemetry_endpoint::run_telemetry_endpoint(&settings.telemetry_endpoint),
	)?;

	Ok(())
}
